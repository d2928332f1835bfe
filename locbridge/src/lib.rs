#![forbid(unsafe_code)]
//! Localization bridge for hybrid mobile projects.
//!
//! Reads the shared `translations/app/<lang>.json` files of a project and
//! renders them into the native resources of each platform: Android
//! `strings.xml` files are merged in place, iOS `.strings` files are written
//! and registered in the Xcode project.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use locbridge::{AndroidTarget, HookConfig, IosTarget, NoProjectCache, run_hook};
//!
//! let config = HookConfig::new("my-app")
//!     .with_android(AndroidTarget {
//!         res_dir: "my-app/platforms/android/app/src/main/res".into(),
//!     })
//!     .with_ios(IosTarget::for_app("my-app/platforms/ios", "My App"));
//!
//! let report = run_hook(&config, &NoProjectCache)?;
//! println!("{} files written", report.files_written());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Translation files
//!
//! ```json
//! {
//!   "locale": { "android": ["en"], "ios": ["en", "en-GB"] },
//!   "app": { "greeting": "Hello %1$@" },
//!   "config_android": { "app_name": "Demo" },
//!   "config_ios": { "CFBundleDisplayName": "Demo" }
//! }
//! ```
//!
//! - **Android**: `app` with `config_android` on top, placeholders rewritten
//!   (`%1$@` becomes `%1$s`), apostrophes escaped.
//! - **iOS**: `app` goes to `Localizable.strings`, `config_ios` to
//!   `InfoPlist.strings`.

pub mod android;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod formats;
pub mod ios;
pub mod loader;
pub mod traits;
pub mod transform;
pub mod types;
pub mod xcode;

// Re-export most used types for easy consumption
pub use crate::{
    config::{AndroidTarget, HookConfig, IosTarget},
    dispatch::{HookReport, run_hook},
    error::Error,
    loader::load_translations,
    transform::{Pipeline, ValueTransform},
    types::{Platform, StringMap, TranslationDocument, TranslationSource},
    xcode::{NoProjectCache, ProjectFileCache},
};
