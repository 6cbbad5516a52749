//! Configuration for the Homestead manager.
//!
//! Two unrelated kinds of configuration live here:
//! - [`settings`]: where the Homestead checkout, its config and the tools are,
//!   loaded from the rancher settings file and shared live with the controller
//! - [`homestead`]: the few display values pulled out of `Homestead.yaml`

pub mod homestead;
pub mod settings;

pub use homestead::HomesteadConfig;
pub use settings::{LifecycleSettings, SharedSettings, CONFIG_FILE, PROJECT_MARKER};
