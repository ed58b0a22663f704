pub use crate::{
    DEFAULT_PORT,
    protocol::{LimitExceeded, RESPONSE, TERMINATOR, read_terminated, write_terminated},
};
