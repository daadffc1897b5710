mod trailers;
pub use self::trailers::TrailingHeaders;

mod frame;
pub use self::frame::*;

mod reader;
pub use self::reader::{AwsChunkedBuilder, AwsChunkedReader, StreamState};

mod body;
pub use self::body::AwsChunkedBody;

mod request;
pub use self::request::should_use_aws_chunked;
