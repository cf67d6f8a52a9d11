//! Path codecs: list keys, structural references and the canonical text
//! form.

pub mod key;
pub mod reference;
pub mod text;

pub use key::ListKeyCodec;
pub use reference::PathReferenceCodec;
pub use text::{PrefixResolver, TextPathCodec};
