use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A package archive format, selected by filename suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Debian/Ubuntu `.deb`: an `ar` envelope around a compressed `data.tar`.
    Deb,
    /// Red Hat family `.rpm`: lead, headers and a compressed `cpio` payload.
    Rpm,
    /// Alpine `.apk`: concatenated gzip segments forming one tar stream.
    Apk,
    /// Arch Linux `.pkg.tar.zst` (and legacy `.pkg.tar.xz`).
    Arch,
}

impl Format {
    /// Every format, in a stable order.
    pub const ALL: [Format; 4] = [Format::Deb, Format::Rpm, Format::Apk, Format::Arch];

    /// Filename suffixes that identify this format.
    #[must_use]
    pub fn suffixes(&self) -> &'static [&'static str] {
        match self {
            Format::Deb => &[".deb"],
            Format::Rpm => &[".rpm"],
            Format::Apk => &[".apk"],
            Format::Arch => &[".pkg.tar.zst", ".pkg.tar.xz"],
        }
    }

    /// Detect the format of a package from its filename.
    ///
    /// ```
    /// use mirrorhash_archive::Format;
    ///
    /// assert_eq!(Format::from_filename("foo_1.2.3_amd64.deb"), Some(Format::Deb));
    /// assert_eq!(Format::from_filename("bash-5.2.037-1-x86_64.pkg.tar.zst"), Some(Format::Arch));
    /// assert_eq!(Format::from_filename("bash-5.2.037-1-x86_64.pkg.tar.zst.sig"), None);
    /// ```
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.matches(filename))
    }

    /// Whether `filename` carries one of this format's suffixes.
    #[must_use]
    pub fn matches(&self, filename: &str) -> bool {
        self.strip_suffix(filename).is_some_and(|stem| !stem.is_empty())
    }

    /// The filename without its package suffix.
    #[must_use]
    pub fn strip_suffix<'a>(&self, filename: &'a str) -> Option<&'a str> {
        self.suffixes().iter().find_map(|suffix| filename.strip_suffix(suffix))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Deb => "deb",
            Format::Rpm => "rpm",
            Format::Apk => "apk",
            Format::Arch => "pkg.tar.zst",
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "deb" => Ok(Format::Deb),
            "rpm" => Ok(Format::Rpm),
            "apk" => Ok(Format::Apk),
            "pkg.tar.zst" | "pkg.tar.xz" | "arch" => Ok(Format::Arch),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}
