//! Build target → installer package name.

use anyhow::Result;

/// Package suffix used in update-API paths (`win32-{pkg}`) for the given
/// architecture name as reported by `std::env::consts::ARCH`.
pub fn arch_package_for(arch: &str) -> Result<&'static str> {
    match arch {
        "x86_64" => Ok("x64-user"),
        "x86" => Ok("user"),
        "aarch64" => Ok("arm64-user"),
        other => anyhow::bail!("unsupported architecture: {}", other),
    }
}

/// Package suffix for the architecture this binary was built for.
pub fn arch_package() -> Result<&'static str> {
    arch_package_for(std::env::consts::ARCH)
}
