//! Writes a short-lived self-signed certificate for running the relay
//! locally and points `.env` at it.
//!
//! ```text
//! cargo run --manifest-path scripts/Cargo.toml -- [OUT_DIR] [--force] [--days N]
//! ```
//!
//! OUT_DIR defaults to `certs`. Existing files are kept unless `--force`
//! is given. The relay reads TLS_CERT_PATH and TLS_KEY_PATH from `.env`
//! through dotenvy, so after this runs `cargo run` picks the pair up.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use ring::digest::{digest, SHA256};

/// Browsers refuse `serverCertificateHashes` for certificates valid longer
const MAX_DAYS: u64 = 14;
const ENV_FILE: &str = ".env";

struct Args {
    out_dir: PathBuf,
    force: bool,
    days: u64,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        out_dir: PathBuf::from("certs"),
        force: false,
        days: MAX_DAYS,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--force" => parsed.force = true,
            "--days" => {
                let value = args.next().ok_or("--days needs a value")?;
                let days: u64 = value
                    .parse()
                    .map_err(|_| format!("invalid --days value: {value}"))?;
                if !(1..=MAX_DAYS).contains(&days) {
                    return Err(format!("--days must be between 1 and {MAX_DAYS}"));
                }
                parsed.days = days;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {flag}")),
            dir => parsed.out_dir = PathBuf::from(dir),
        }
    }
    Ok(parsed)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    let cert_path = args.out_dir.join("cert.pem");
    let key_path = args.out_dir.join("key.pem");

    if cert_path.exists() && key_path.exists() && !args.force {
        println!(
            "Keeping existing {} and {} (pass --force to replace them)",
            cert_path.display(),
            key_path.display()
        );
    } else {
        let hashes = generate(&cert_path, &key_path, args.days)?;
        println!("Wrote {} (valid {} days)", cert_path.display(), args.days);
        println!("Wrote {}", key_path.display());
        println!();
        println!("serverCertificateHashes value:");
        println!("  {}", hashes.cert);
        println!("Chrome flag for this key:");
        println!("  --ignore-certificate-errors-spki-list={}", hashes.spki);
        println!();
    }

    let cert_var = cert_path.to_string_lossy().into_owned();
    let key_var = key_path.to_string_lossy().into_owned();
    let existing = fs::read_to_string(ENV_FILE).unwrap_or_default();
    let updated = upsert_env(
        &existing,
        &[("TLS_CERT_PATH", cert_var.as_str()), ("TLS_KEY_PATH", key_var.as_str())],
    );
    if updated != existing {
        fs::write(ENV_FILE, updated)?;
        println!("Updated {ENV_FILE} with TLS_CERT_PATH and TLS_KEY_PATH");
    }

    Ok(())
}

struct Hashes {
    cert: String,
    spki: String,
}

fn generate(cert_path: &Path, key_path: &Path, days: u64) -> Result<Hashes, Box<dyn Error>> {
    let mut params = CertificateParams::new(vec!["localhost".into(), "127.0.0.1".into()])?;
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "Cat Fighter Relay Dev");

    let now = SystemTime::now();
    params.not_before = now.into();
    params.not_after = (now + Duration::from_secs(days * 24 * 60 * 60)).into();

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    if let Some(dir) = cert_path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(cert_path, cert.pem())?;
    fs::write(key_path, key_pair.serialize_pem())?;

    Ok(Hashes {
        cert: sha256_b64(cert.der()),
        spki: sha256_b64(&key_pair.public_key_der()),
    })
}

fn sha256_b64(bytes: &[u8]) -> String {
    STANDARD.encode(digest(&SHA256, bytes).as_ref())
}

/// Set each `KEY=value` in a dotenv file body, replacing an existing
/// assignment in place and appending otherwise. Other lines are untouched.
fn upsert_env(contents: &str, vars: &[(&str, &str)]) -> String {
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
    for (key, value) in vars {
        let assignment = format!("{key}={value}");
        let prefix = format!("{key}=");
        match lines.iter_mut().find(|line| line.trim_start().starts_with(&prefix)) {
            Some(line) => *line = assignment,
            None => lines.push(assignment),
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.out_dir, PathBuf::from("certs"));
        assert!(!parsed.force);
        assert_eq!(parsed.days, MAX_DAYS);
    }

    #[test]
    fn test_flags_and_dir() {
        let parsed = args(&["tmp/tls", "--force", "--days", "3"]).unwrap();
        assert_eq!(parsed.out_dir, PathBuf::from("tmp/tls"));
        assert!(parsed.force);
        assert_eq!(parsed.days, 3);

        assert!(args(&["--days", "30"]).is_err());
        assert!(args(&["--days"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn test_upsert_env_appends_and_replaces() {
        let before = "RUST_LOG=debug\nTLS_CERT_PATH=old/cert.pem\n";
        let after = upsert_env(
            before,
            &[("TLS_CERT_PATH", "certs/cert.pem"), ("TLS_KEY_PATH", "certs/key.pem")],
        );
        assert_eq!(
            after,
            "RUST_LOG=debug\nTLS_CERT_PATH=certs/cert.pem\nTLS_KEY_PATH=certs/key.pem\n"
        );
        // Idempotent
        assert_eq!(
            upsert_env(
                &after,
                &[("TLS_CERT_PATH", "certs/cert.pem"), ("TLS_KEY_PATH", "certs/key.pem")]
            ),
            after
        );
    }

    #[test]
    fn test_upsert_env_on_empty_file() {
        assert_eq!(upsert_env("", &[("TLS_KEY_PATH", "k.pem")]), "TLS_KEY_PATH=k.pem\n");
    }
}
