pub mod value;
pub mod flatten;
pub mod detect;
pub mod urlencoded;
pub mod multipart;
pub mod body;
pub mod form;

pub use value::{FieldValue, FileStream, InputRecord, Pipe, ReaderStream, TransferOptions};
pub use flatten::{flatten, resolve, Payload};
pub use detect::{is_byte_stream, is_file_like, select_encoding, Encoding};
pub use multipart::FormData;
pub use body::Body;
pub use form::{encode, encode_json, FormError, FormOptions, FormOutput, Headers, NamedOutput, OutputSlot};
