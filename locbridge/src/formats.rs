//! Native resource formats read and written by the hook.
//!
//! - [`android_strings`]: Android `res/values*/strings.xml`
//! - [`strings`]: Apple `.strings` (`Localizable.strings`, `InfoPlist.strings`)
//! - [`pbxproj`]: the old-style property list used by `project.pbxproj`

pub mod android_strings;
pub mod pbxproj;
pub mod strings;

// Reexporting the formats for easier access
pub use android_strings::Document as AndroidStringsDocument;
pub use pbxproj::Plist as PbxPlist;
pub use strings::Format as StringsFormat;
