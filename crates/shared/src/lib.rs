//! Wire protocol shared by the room server and its clients
//!
//! JSON text frames, one message per frame, tagged by a `type` field.

pub mod protocol;

pub use protocol::{
    AckResult, ChatLine, ClientMessage, MoveSubmission, SequencedMove, ServerMessage, Side,
};
