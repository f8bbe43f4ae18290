use crate::consts::{APK_FILENAME_REGEX, ARCH_FILENAME_REGEX, RPM_FILENAME_REGEX, UNKNOWN_VERSION};
use crate::format::Format;
use regex::Regex;

/// The name and version a package's hashes are recorded under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: String,
    pub version: String,
}

impl Label {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into() }
    }

    /// Parse a label from a package filename using the format's naming
    /// convention.
    ///
    /// ```
    /// use mirrorhash_archive::{Format, Label};
    ///
    /// assert_eq!(
    ///     Label::parse(Format::Deb, "foo_1.2.3_amd64.deb"),
    ///     Some(Label::new("foo", "1.2.3")),
    /// );
    /// assert_eq!(
    ///     Label::parse(Format::Rpm, "bash-5.1.8-9.el9.x86_64.rpm"),
    ///     Some(Label::new("bash", "5.1.8-9.el9")),
    /// );
    /// ```
    #[must_use]
    pub fn parse(format: Format, filename: &str) -> Option<Self> {
        match format {
            Format::Deb => {
                let mut fields = format.strip_suffix(filename)?.split('_');
                let name = fields.next().filter(|s| !s.is_empty())?;
                let version = fields.next().filter(|s| !s.is_empty())?;
                Some(Self::new(name, version))
            },
            Format::Rpm => Self::captures(&RPM_FILENAME_REGEX, filename),
            Format::Apk => Self::captures(&APK_FILENAME_REGEX, filename),
            Format::Arch => Self::captures(&ARCH_FILENAME_REGEX, filename),
        }
    }

    /// The label used when a filename matches no naming convention: the
    /// filename minus its suffix, with an unknown version.
    #[must_use]
    pub fn placeholder(format: Format, filename: &str) -> Self {
        let name = format.strip_suffix(filename).filter(|s| !s.is_empty()).unwrap_or(filename);
        Self::new(name, UNKNOWN_VERSION)
    }

    /// Pick the label for a package: metadata embedded in the archive wins,
    /// then the filename convention, then a placeholder (logged, since the
    /// hashes are still worth keeping).
    pub fn resolve(format: Format, filename: &str, embedded: Option<Label>) -> Self {
        if let Some(label) = embedded {
            return label;
        }
        Self::parse(format, filename).unwrap_or_else(|| {
            let label = Self::placeholder(format, filename);
            tracing::warn!(
                filename,
                %format,
                name = %label.name,
                "filename does not follow the package naming convention, using placeholder label"
            );
            label
        })
    }

    fn captures(regex: &Regex, filename: &str) -> Option<Self> {
        let captures = regex.captures(filename)?;
        Some(Self::new(captures.name("name")?.as_str(), captures.name("version")?.as_str()))
    }
}
