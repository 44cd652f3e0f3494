pub mod invoker;

pub use invoker::{resolve_program, CodecCommand, CodecError, CodecInvoker, CodecResult};
