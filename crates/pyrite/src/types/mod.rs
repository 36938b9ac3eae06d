/// Builtin container and text types.
///
/// Mutable containers (list, dict, set, bytearray) live on the heap and are used
/// through `Ref` handles; immutable ones (tuple, str, bytes, range) are shared
/// values that clone cheaply.
pub mod bytes;
pub mod dict;
pub mod list;
pub mod range;
pub mod set;
pub mod str;
pub(crate) mod table;
pub mod tuple;

pub use bytes::{ByteArray, ByteSequence, ByteSequenceMut, Bytes};
pub use dict::{Dict, DictItems, DictKeys, DictValues};
pub use list::List;
pub use range::Range;
pub use set::Set;
pub use str::Str;
pub use table::TableCursor;
pub use tuple::{Pair, Tuple};
