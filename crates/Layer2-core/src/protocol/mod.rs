//! # Channel protocol
//!
//! One `ChannelSession` per client connection. The endpoint a channel was
//! opened on decides how its messages are read:
//!
//! | Endpoint     | Inbound                          | Effect                            |
//! |--------------|----------------------------------|-----------------------------------|
//! | `/code`      | source with `File_name:`/`Project:` comments | file written under Projects |
//! | `/PMS`       | JSON build request               | dispatch to a runnable            |
//! | `/terminput` | raw line                         | stdin of the newest live session  |
//! | `/stop`      | `{"stopped": true}`              | kill every session                |

mod annotation;
mod endpoint;
mod hub;
mod request;
mod session;

pub use annotation::{annotation_buffer, extract_identity, FileIdentity};
pub use endpoint::Endpoint;
pub use hub::ChannelHub;
pub use request::{BuildAck, BuildRequest, StopAck, StopRequest, STOP_MESSAGE};
pub use session::{ChannelSession, ChannelState, CloseReason};

/// Version of the client protocol
pub const PROTOCOL_VERSION: &str = "1.2.2";
