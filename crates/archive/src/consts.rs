use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// name-version-rN.apk
regex!(APK_FILENAME_REGEX, r"^(?P<name>.+)-(?P<version>[^-]+-r\d+)\.apk$");
// name-pkgver-pkgrel-arch.pkg.tar.{zst,xz}
regex!(
    ARCH_FILENAME_REGEX,
    r"^(?P<name>.+)-(?P<version>[^-]+-[^-]+)-(?P<arch>[^-]+)\.pkg\.tar\.(?:zst|xz)$"
);
// name-version-release.arch.rpm
regex!(RPM_FILENAME_REGEX, r"^(?P<name>.+)-(?P<version>[^-]+-[^-]+)\.(?P<arch>[^.-]+)\.rpm$");

/// Package-manager metadata at the root of Alpine and Arch archives.
pub(crate) const CONTROL_FILES: &[&str] = &[
    ".PKGINFO",
    ".MTREE",
    ".INSTALL",
    ".BUILDINFO",
    ".CHANGELOG",
    ".pre-install",
    ".post-install",
    ".pre-upgrade",
    ".post-upgrade",
    ".pre-deinstall",
    ".post-deinstall",
    ".trigger",
];
/// Alpine signature segments, e.g. `.SIGN.RSA.alpine-devel@lists.alpinelinux.org-6165ee59.rsa.pub`.
pub(crate) const SIGNATURE_PREFIX: &str = ".SIGN.";

pub(crate) const DEB_DATA_MEMBER: &str = "data.tar";
pub(crate) const UNKNOWN_VERSION: &str = "unknown";
