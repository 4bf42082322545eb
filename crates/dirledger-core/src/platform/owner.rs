//! File ownership lookup.
//!
//! Unix reports the numeric `uid:gid` pair straight from the inode. Windows
//! reads the owner SID from the file's security descriptor and resolves it to
//! a `DOMAIN\account` name.
use std::fs::Metadata;
use std::path::Path;

/// Resolve the owner of `path`. `meta` is the already-fetched metadata.
#[cfg(unix)]
pub fn resolve(_path: &Path, meta: &Metadata) -> Result<String, String> {
    use std::os::unix::fs::MetadataExt;
    Ok(format!("{}:{}", meta.uid(), meta.gid()))
}

/// Resolve the owner of `path`. `meta` is the already-fetched metadata.
#[cfg(windows)]
pub fn resolve(path: &Path, _meta: &Metadata) -> Result<String, String> {
    use windows::core::{PCWSTR, PWSTR};
    use windows::Win32::Foundation::{LocalFree, ERROR_SUCCESS, HLOCAL};
    use windows::Win32::Security::Authorization::{GetNamedSecurityInfoW, SE_FILE_OBJECT};
    use windows::Win32::Security::{
        LookupAccountSidW, OWNER_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR, PSID, SID_NAME_USE,
    };

    // Build a null-terminated UTF-16 path.
    let wide_path: Vec<u16> = path
        .as_os_str()
        .to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0u16))
        .collect();

    unsafe {
        let mut owner_sid = PSID::default();
        let mut descriptor = PSECURITY_DESCRIPTOR::default();

        let status = GetNamedSecurityInfoW(
            PCWSTR(wide_path.as_ptr()),
            SE_FILE_OBJECT,
            OWNER_SECURITY_INFORMATION,
            Some(&mut owner_sid),
            None,
            None,
            None,
            &mut descriptor,
        );
        if status != ERROR_SUCCESS {
            return Err(format!("GetNamedSecurityInfoW failed with code {}", status.0));
        }

        let mut name = [0u16; 256];
        let mut domain = [0u16; 256];
        let mut name_len = name.len() as u32;
        let mut domain_len = domain.len() as u32;
        let mut sid_use = SID_NAME_USE::default();

        let lookup = LookupAccountSidW(
            PCWSTR::null(),
            owner_sid,
            PWSTR(name.as_mut_ptr()),
            &mut name_len,
            PWSTR(domain.as_mut_ptr()),
            &mut domain_len,
            &mut sid_use,
        );

        // The SID points into the descriptor, so free only after the lookup.
        let _ = LocalFree(HLOCAL(descriptor.0));

        lookup.map_err(|e| format!("LookupAccountSidW failed: {e}"))?;

        let name = String::from_utf16_lossy(&name[..name_len as usize]);
        let domain = String::from_utf16_lossy(&domain[..domain_len as usize]);
        if domain.is_empty() {
            Ok(name)
        } else {
            Ok(format!("{domain}\\{name}"))
        }
    }
}

/// Ownership is not available on this platform.
#[cfg(not(any(unix, windows)))]
pub fn resolve(_path: &Path, _meta: &Metadata) -> Result<String, String> {
    Err("owner lookup is not supported on this platform".into())
}
