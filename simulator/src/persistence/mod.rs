pub mod local;
pub mod remote;

pub use local::LocalExportSink;
pub use remote::RemoteSink;
