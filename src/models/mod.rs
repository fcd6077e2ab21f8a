pub mod fingerprint;
pub mod profile;
pub mod stage;

pub use fingerprint::{Fingerprint, FingerprintConstraints};
pub use profile::{Profile, Proxy};
pub use stage::{Stage, STORE_FILE_NAME};
