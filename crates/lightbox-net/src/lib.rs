#![forbid(unsafe_code)]

mod client;
mod error;
mod timeout;
mod traits;
mod types;

pub use crate::{
    client::HttpClient,
    error::{NetError, NetResult},
    timeout::TimeoutNet,
    traits::{ByteStream, Net, NetExt, RemoteBody},
    types::NetOptions,
};
