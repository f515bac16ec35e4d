#![cfg(test)]
#![allow(dead_code)]

use url::Url;

pub fn create_pac_script(proxy_host: &str, proxy_port: u16) -> String {
    format!(
        r#"
function FindProxyForURL(url, host) {{
    if (isPlainHostName(host)) {{
        return "DIRECT";
    }}
    return "PROXY {proxy_host}:{proxy_port}; DIRECT";
}}
"#,
        proxy_host = proxy_host,
        proxy_port = proxy_port
    )
}

/// A PAC script written to a temporary file for the lifetime of the fixture.
pub struct PacFileFixture {
    pac_file: std::path::PathBuf,
}

impl PacFileFixture {
    pub fn setup(name: &str, script: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let pac_file = std::env::temp_dir().join(format!("proxyresolver_{}_{}.pac", name, std::process::id()));
        std::fs::write(&pac_file, script)?;
        Ok(Self { pac_file })
    }

    pub fn url(&self) -> String {
        Url::from_file_path(&self.pac_file)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", self.pac_file.display()))
    }
}

impl Drop for PacFileFixture {
    fn drop(&mut self) {
        std::fs::remove_file(&self.pac_file).ok();
    }
}
