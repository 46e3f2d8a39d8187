//! Pipeline stages for converting one exam PDF into one JSON file.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the network stage can be swapped for a stub.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──────────────▶ persist
//! (list,    (base64)   (call, parse JSON,   (temp file +
//!  read)                validate schema)     no-clobber rename)
//! ```
//!
//! 1. [`input`]  : list candidate files, derive output paths, read bytes
//! 2. [`encode`] : wrap the PDF bytes as an inline base64 document
//! 3. [`llm`]    : one un-retried service call, then JSON decode and schema
//!    validation; the only stage with network I/O
//! 4. [`persist`]: atomic write of the validated collection

pub mod encode;
pub mod input;
pub mod llm;
pub mod persist;
