pub mod block_io;
pub mod gpt_ops;

pub use block_io::ImageBlockIo;
