//! Built-in provider catalog.
//!
//! Every provider here is a [`CatalogProvider`]: a static, newest-first
//! version list plus a function that turns `(version, arch, os)` into the
//! vendor's artifact URL. Vendors spell architectures and operating systems
//! differently, so each URL builder does its own translation.

use std::path::{Path, PathBuf};

use crate::errors::SdkError;
use crate::toolchain::kind::ToolchainKind;
use crate::toolchain::paths::canonical_install_dir;
use crate::toolchain::platform::{Arch, Os};
use crate::toolchain::provider::{LATEST, Provider, check_version_syntax};

type UrlBuilder = fn(&str, Arch, Os) -> Result<String, SdkError>;

/// Table-driven [`Provider`].
pub struct CatalogProvider {
    name: &'static str,
    display_name: &'static str,
    kind: ToolchainKind,
    versions: &'static [&'static str],
    url: UrlBuilder,
    os: Os,
    sdks: PathBuf,
}

impl CatalogProvider {
    fn offers(&self, version: &str) -> bool {
        self.versions.contains(&version)
    }
}

impl Provider for CatalogProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn display_name(&self) -> &str {
        self.display_name
    }

    fn kind(&self) -> ToolchainKind {
        self.kind.clone()
    }

    fn list_versions(&self) -> Result<Vec<String>, SdkError> {
        Ok(self.versions.iter().map(ToString::to_string).collect())
    }

    fn latest_version(&self) -> Result<String, SdkError> {
        self.versions
            .first()
            .map(ToString::to_string)
            .ok_or_else(|| SdkError::invalid_version(LATEST, "provider offers no versions"))
    }

    fn download_url(&self, version: &str, arch: Arch) -> Result<String, SdkError> {
        if !self.offers(version) {
            return Err(self.not_offered(version));
        }
        (self.url)(version, arch, self.os)
    }

    fn checksum(&self, _version: &str, _arch: Arch) -> Option<String> {
        None
    }

    fn default_install_path(&self, version: &str) -> PathBuf {
        canonical_install_dir(&self.sdks, &self.kind, self.name, version)
    }

    fn validate(&self, version: &str) -> Result<(), SdkError> {
        check_version_syntax(version)?;
        if version.eq_ignore_ascii_case(LATEST) || self.offers(version) {
            Ok(())
        } else {
            Err(self.not_offered(version))
        }
    }
}

impl CatalogProvider {
    fn not_offered(&self, version: &str) -> SdkError {
        SdkError::invalid_version(
            version,
            format!(
                "{} does not offer this version; run 'unosdk versions {} {}' to see the available ones",
                self.display_name, self.kind, self.name
            ),
        )
    }
}

/// All built-in providers, rooted at `sdks`.
#[must_use]
pub fn builtin_providers(sdks: &Path, os: Os) -> Vec<CatalogProvider> {
    let entry = |name: &'static str,
                 display_name: &'static str,
                 kind: ToolchainKind,
                 versions: &'static [&'static str],
                 url: UrlBuilder| CatalogProvider {
        name,
        display_name,
        kind,
        versions,
        url,
        os,
        sdks: sdks.to_path_buf(),
    };

    vec![
        entry(
            "openjdk",
            "Eclipse Temurin (OpenJDK)",
            ToolchainKind::Java,
            &["25.0.0", "21.0.1", "17.0.9", "11.0.21", "8u392"],
            temurin_url,
        ),
        entry(
            "amazoncorretto",
            "Amazon Corretto",
            ToolchainKind::Java,
            &["25.0.0", "21.0.1", "17.0.9", "11.0.21", "8.392.08.1"],
            corretto_url,
        ),
        entry(
            "graalvm",
            "GraalVM Community",
            ToolchainKind::Java,
            &["25.0.2", "21.0.2", "17.0.9"],
            graalvm_url,
        ),
        entry(
            "nodejs",
            "Node.js",
            ToolchainKind::Node,
            &["20.10.0", "18.19.0", "16.20.2", "14.21.3"],
            nodejs_url,
        ),
        entry(
            "python",
            "Python (embeddable)",
            ToolchainKind::Python,
            &["3.12.1", "3.11.7", "3.10.13", "3.9.18"],
            python_url,
        ),
        entry(
            "golang",
            "Go",
            ToolchainKind::Go,
            &[
                "1.23.5", "1.23.4", "1.23.3", "1.23.2", "1.23.1", "1.23.0", "1.22.10", "1.22.9",
                "1.22.8", "1.22.7", "1.22.6", "1.22.5", "1.22.4", "1.22.3", "1.22.2", "1.22.1",
                "1.22.0", "1.21.13", "1.21.12", "1.21.11", "1.21.10", "1.21.9", "1.21.8",
                "1.21.7", "1.21.6", "1.21.5", "1.21.4", "1.21.3", "1.21.2", "1.21.1", "1.21.0",
            ],
            golang_url,
        ),
        entry(
            "apache",
            "Apache Maven",
            ToolchainKind::Maven,
            &[
                "3.9.9", "3.9.8", "3.9.7", "3.9.6", "3.8.8", "3.8.7", "3.8.6", "3.6.3",
            ],
            maven_url,
        ),
        entry(
            "gradle",
            "Gradle",
            ToolchainKind::Gradle,
            &[
                "8.12", "8.11.1", "8.11", "8.10.2", "8.10.1", "8.10", "8.9", "8.8", "8.7", "8.6",
                "8.5", "8.4", "8.3", "8.2.1", "8.2", "8.1.1", "8.1", "8.0.2", "8.0.1", "8.0",
                "7.6.4", "7.6.3", "7.6.2", "7.6.1", "7.6",
            ],
            gradle_url,
        ),
        entry(
            "flutter",
            "Flutter SDK",
            ToolchainKind::Flutter,
            &[
                "3.27.2", "3.27.1", "3.24.5", "3.22.3", "3.19.6", "3.16.9", "3.13.9",
            ],
            flutter_url,
        ),
        entry(
            "mingw",
            "MinGW-w64 (GCC)",
            ToolchainKind::C,
            MINGW_VERSIONS,
            mingw_url,
        ),
        entry(
            "mingw",
            "MinGW-w64 (G++)",
            ToolchainKind::Cpp,
            MINGW_VERSIONS,
            mingw_url,
        ),
    ]
}

fn unsupported(product: &str, arch: Arch, os: Os) -> SdkError {
    SdkError::unsupported_platform(format!("{product} is not published for {os}/{arch}"))
}

fn temurin_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    let (feature, tag, file_version) = match version {
        "25.0.0" => ("25", "jdk-25+36", "25_36"),
        "21.0.1" => ("21", "jdk-21.0.1+12", "21.0.1_12"),
        "17.0.9" => ("17", "jdk-17.0.9+9", "17.0.9_9"),
        "11.0.21" => ("11", "jdk-11.0.21+9", "11.0.21_9"),
        "8u392" => ("8", "jdk8u392-b08", "8u392b08"),
        other => {
            return Err(SdkError::invalid_version(other, "no Temurin release for this version"));
        }
    };
    let arch_token = match (arch, os) {
        (Arch::X64, _) => "x64",
        (Arch::Arm64, _) => "aarch64",
        (Arch::X86, Os::Windows) => "x86-32",
        (Arch::X86, _) => return Err(unsupported("Temurin", arch, os)),
    };
    let os_token = match os {
        Os::Windows => "windows",
        Os::Linux => "linux",
        Os::Macos => "mac",
    };
    Ok(format!(
        "https://github.com/adoptium/temurin{feature}-binaries/releases/download/{tag}/OpenJDK{feature}U-jdk_{arch_token}_{os_token}_hotspot_{file_version}.{}",
        os.archive_extension()
    ))
}

fn corretto_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    let major = version.split('.').next().unwrap_or(version);
    let arch_token = match (arch, os) {
        (Arch::X64, _) => "x64",
        (Arch::Arm64, _) => "aarch64",
        (Arch::X86, Os::Windows) => "x86",
        (Arch::X86, _) => return Err(unsupported("Amazon Corretto", arch, os)),
    };
    Ok(format!(
        "https://corretto.aws/downloads/latest/amazon-corretto-{major}-{arch_token}-{}-jdk.{}",
        os.as_str(),
        os.archive_extension()
    ))
}

fn graalvm_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    // 25.0.2 is the JDK level; the community build for it is tagged 25.0.0.
    let release = if version == "25.0.2" { "25.0.0" } else { version };
    let arch_token = match arch {
        Arch::X64 => "x64",
        Arch::Arm64 => "aarch64",
        Arch::X86 => return Err(unsupported("GraalVM", arch, os)),
    };
    Ok(format!(
        "https://github.com/graalvm/graalvm-ce-builds/releases/download/jdk-{release}/graalvm-community-jdk-{release}_{}-{arch_token}_bin.{}",
        os.as_str(),
        os.archive_extension()
    ))
}

fn nodejs_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    let os_token = match os {
        Os::Windows => "win",
        Os::Linux => "linux",
        Os::Macos => "darwin",
    };
    let arch_token = match (arch, os) {
        (Arch::X64, _) => "x64",
        (Arch::Arm64, _) => "arm64",
        (Arch::X86, Os::Windows) => "x86",
        (Arch::X86, _) => return Err(unsupported("Node.js", arch, os)),
    };
    Ok(format!(
        "https://nodejs.org/dist/v{version}/node-v{version}-{os_token}-{arch_token}.{}",
        os.archive_extension()
    ))
}

fn python_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    if !os.is_windows() {
        return Err(unsupported("The Python embeddable package", arch, os));
    }
    let arch_token = match arch {
        Arch::X64 => "amd64",
        Arch::X86 => "win32",
        Arch::Arm64 => "arm64",
    };
    Ok(format!(
        "https://www.python.org/ftp/python/{version}/python-{version}-embed-{arch_token}.zip"
    ))
}

fn golang_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    let os_token = match os {
        Os::Windows => "windows",
        Os::Linux => "linux",
        Os::Macos => "darwin",
    };
    let arch_token = match (arch, os) {
        (Arch::X64, _) => "amd64",
        (Arch::Arm64, _) => "arm64",
        (Arch::X86, Os::Macos) => return Err(unsupported("Go", arch, os)),
        (Arch::X86, _) => "386",
    };
    Ok(format!(
        "https://go.dev/dl/go{version}.{os_token}-{arch_token}.{}",
        os.archive_extension()
    ))
}

fn maven_url(version: &str, _arch: Arch, os: Os) -> Result<String, SdkError> {
    Ok(format!(
        "https://archive.apache.org/dist/maven/maven-3/{version}/binaries/apache-maven-{version}-bin.{}",
        os.archive_extension()
    ))
}

fn gradle_url(version: &str, _arch: Arch, _os: Os) -> Result<String, SdkError> {
    Ok(format!(
        "https://services.gradle.org/distributions/gradle-{version}-bin.zip"
    ))
}

fn flutter_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    const BASE: &str = "https://storage.googleapis.com/flutter_infra_release/releases/stable";
    match (os, arch) {
        (Os::Windows, Arch::X64) => Ok(format!(
            "{BASE}/windows/flutter_windows_{version}-stable.zip"
        )),
        (Os::Macos, Arch::X64) => Ok(format!("{BASE}/macos/flutter_macos_{version}-stable.zip")),
        (Os::Macos, Arch::Arm64) => Ok(format!(
            "{BASE}/macos/flutter_macos_arm64_{version}-stable.zip"
        )),
        // Linux builds ship as tar.xz, which the extractor does not read.
        _ => Err(unsupported("Flutter", arch, os)),
    }
}

const MINGW_VERSIONS: &[&str] = &[
    "15.2.0", "14.2.0", "14.1.0", "13.2.0", "13.1.0", "12.3.0", "12.2.0", "12.1.0", "11.3.0",
    "11.2.0", "11.1.0",
];

fn mingw_url(version: &str, arch: Arch, os: Os) -> Result<String, SdkError> {
    if !os.is_windows() {
        return Err(unsupported("WinLibs MinGW-w64", arch, os));
    }
    let (tag, runtime) = match version {
        "15.2.0" => ("15.2.0posix-13.0.0-ucrt-r5", "mingw-w64ucrt-13.0.0-r5"),
        "14.2.0" => ("14.2.0posix-19.1.1-12.0.0-ucrt-r2", "mingw-w64ucrt-12.0.0-r2"),
        "14.1.0" => ("14.1.0posix-18.1.5-11.0.1-ucrt-r1", "mingw-w64ucrt-11.0.1-r1"),
        "13.2.0" => ("13.2.0posix-17.0.6-11.0.1-ucrt-r5", "mingw-w64ucrt-11.0.1-r5"),
        "13.1.0" => ("13.1.0-16.0.5-11.0.0-ucrt-r5", "mingw-w64ucrt-11.0.0-r5"),
        "12.3.0" => ("12.3.0-16.0.6-11.0.0-ucrt-r1", "mingw-w64ucrt-11.0.0-r1"),
        "12.2.0" => ("12.2.0-15.0.7-10.0.0-ucrt-r4", "mingw-w64ucrt-10.0.0-r4"),
        "12.1.0" => ("12.1.0-14.0.6-10.0.0-ucrt-r3", "mingw-w64ucrt-10.0.0-r3"),
        "11.3.0" => ("11.3.0-14.0.3-10.0.0-ucrt-r3", "mingw-w64ucrt-10.0.0-r3"),
        "11.2.0" => ("11.2.0-13.0.0-9.0.0-ucrt-r5", "mingw-w64ucrt-9.0.0-r5"),
        "11.1.0" => ("11.1.0-12.0.0-9.0.0-r2", "mingw-w64-9.0.0-r2"),
        other => return Err(SdkError::invalid_version(other, "no WinLibs build for this version")),
    };
    let flavour = match arch {
        Arch::X64 => "x86_64-posix-seh",
        Arch::X86 => "i686-posix-dwarf",
        Arch::Arm64 => return Err(unsupported("WinLibs MinGW-w64", arch, os)),
    };
    Ok(format!(
        "https://github.com/brechtsanders/winlibs_mingw/releases/download/{tag}/winlibs-{flavour}-gcc-{version}-{runtime}.zip"
    ))
}
