use crate::error::{Error, ErrorKind};
use mirrorhash_archive::Format;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const UBUNTU: &[&str] = &[
    "https://mirrors.edge.kernel.org/ubuntu/pool/main/",
    "https://mirrors.edge.kernel.org/ubuntu/pool/restricted/",
    "https://mirrors.edge.kernel.org/ubuntu/pool/universe/",
    "https://mirrors.edge.kernel.org/ubuntu/pool/multiverse/",
];

const DEBIAN: &[&str] = &[
    "https://mirrors.edge.kernel.org/debian/pool/main/",
    "https://mirrors.edge.kernel.org/debian/pool/non-free/",
];

const CENTOS: &[&str] = &[
    "https://dfw.mirror.rackspace.com/centos-stream/9-stream/AppStream/x86_64/os/Packages/",
    "https://dfw.mirror.rackspace.com/centos-stream/10-stream/AppStream/x86_64/os/Packages/",
];

const ROCKY: &[&str] = &[
    "https://dl.rockylinux.org/vault/rocky/8.5/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/8.6/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/8.7/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/8.8/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/8.9/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/9.0/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/9.1/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/9.2/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/9.3/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/9.4/AppStream/x86_64/os/Packages/",
    "https://dl.rockylinux.org/vault/rocky/9.5/AppStream/x86_64/os/Packages/",
    "https://dfw.mirror.rackspace.com/rocky/9.6/AppStream/x86_64/os/Packages/",
    "https://dfw.mirror.rackspace.com/rocky/10.0/AppStream/x86_64/os/Packages/",
];

const FEDORA: &[&str] = &[
    "https://download-ib01.fedoraproject.org/pub/archive/fedora/linux/releases/38/Everything/x86_64/os/Packages/",
    "https://download-ib01.fedoraproject.org/pub/archive/fedora/linux/releases/39/Everything/x86_64/os/Packages/",
    "https://download-ib01.fedoraproject.org/pub/archive/fedora/linux/releases/40/Everything/x86_64/os/Packages/",
    "https://download-ib01.fedoraproject.org/pub/fedora/linux/releases/41/Everything/x86_64/os/Packages/",
    "https://download-ib01.fedoraproject.org/pub/fedora/linux/releases/42/Everything/x86_64/os/Packages/",
];

const ALPINE: &[&str] = &[
    "https://mirrors.edge.kernel.org/alpine/v3.2/main/x86_64/",
    "https://mirrors.edge.kernel.org/alpine/v3.18/main/x86_64/",
    "https://mirrors.edge.kernel.org/alpine/v3.19/main/x86_64/",
    "https://mirrors.edge.kernel.org/alpine/v3.20/main/x86_64/",
    "https://mirrors.edge.kernel.org/alpine/v3.21/main/x86_64/",
    "https://mirrors.edge.kernel.org/alpine/v3.22/main/x86_64/",
    "https://mirrors.edge.kernel.org/alpine/latest-stable/main/x86_64/",
    "https://mirrors.edge.kernel.org/alpine/edge/main/x86_64/",
];

const ARCH: &[&str] = &["https://mirrors.edge.kernel.org/archlinux/pool/packages/"];

/// A supported distribution and the layout of its mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Distro {
    Ubuntu,
    Debian,
    Centos,
    Rocky,
    Fedora,
    Alpine,
    Arch,
}

impl Distro {
    pub const ALL: [Distro; 7] = [
        Distro::Ubuntu,
        Distro::Debian,
        Distro::Centos,
        Distro::Rocky,
        Distro::Fedora,
        Distro::Alpine,
        Distro::Arch,
    ];

    #[must_use]
    pub fn format(&self) -> Format {
        match self {
            Distro::Ubuntu | Distro::Debian => Format::Deb,
            Distro::Centos | Distro::Rocky | Distro::Fedora => Format::Rpm,
            Distro::Alpine => Format::Apk,
            Distro::Arch => Format::Arch,
        }
    }

    /// Default listing roots to crawl.
    #[must_use]
    pub fn roots(&self) -> &'static [&'static str] {
        match self {
            Distro::Ubuntu => UBUNTU,
            Distro::Debian => DEBIAN,
            Distro::Centos => CENTOS,
            Distro::Rocky => ROCKY,
            Distro::Fedora => FEDORA,
            Distro::Alpine => ALPINE,
            Distro::Arch => ARCH,
        }
    }

    /// How many folder levels sit between a root and the deepest packages.
    ///
    /// - Debian pools: `<letter>/<source package>/`
    /// - RPM trees: optionally split into `<letter>/`
    /// - Alpine and Arch: flat
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Distro::Ubuntu | Distro::Debian => 2,
            Distro::Centos | Distro::Rocky | Distro::Fedora => 1,
            Distro::Alpine | Distro::Arch => 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Distro::Ubuntu => "ubuntu",
            Distro::Debian => "debian",
            Distro::Centos => "centos",
            Distro::Rocky => "rocky",
            Distro::Fedora => "fedora",
            Distro::Alpine => "alpine",
            Distro::Arch => "arch",
        }
    }
}

impl Display for Distro {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Distro {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Distro {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ubuntu" => Ok(Distro::Ubuntu),
            "debian" => Ok(Distro::Debian),
            "centos" | "centos-stream" => Ok(Distro::Centos),
            "rocky" | "rockylinux" => Ok(Distro::Rocky),
            "fedora" => Ok(Distro::Fedora),
            "alpine" => Ok(Distro::Alpine),
            "arch" | "archlinux" => Ok(Distro::Arch),
            _ => exn::bail!(ErrorKind::UnknownDistro(s.to_string())),
        }
    }
}
