//! Typed accessors over the catalog's free-form metadata table: backend
//! connection info, container entrypoint/environ/port/volume records, and
//! the archive's README. Each is stored as one JSON-encoded string field
//! (via `serde_json`), the way the reference implementation kept these as
//! ad-hoc top-level keys in its metadata DB.

use serde::{Deserialize, Serialize};

use crate::backend::BackendDescriptor;
use crate::context::Ctx;
use crate::error::{Error, FlistResult};

const FIELD_BACKEND: &str = "backend";
const FIELD_ENTRYPOINT: &str = "entrypoint";
const FIELD_ENVIRON: &str = "environ";
const FIELD_PORT: &str = "port";
const FIELD_VOLUME: &str = "volume";
const FIELD_README: &str = "readme";

fn get_json<T: for<'de> Deserialize<'de>>(ctx: &Ctx, field: &str) -> FlistResult<Option<T>> {
    match ctx.catalog.mdget(field)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::CorruptArchive {
                detail: format!("metadata field '{field}' failed to decode: {e}"),
            }),
        None => Ok(None),
    }
}

fn set_json<T: Serialize>(ctx: &Ctx, field: &str, value: &T) -> FlistResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| Error::CorruptArchive {
        detail: format!("metadata field '{field}' failed to encode: {e}"),
    })?;
    ctx.catalog.mdset(field, &raw)
}

pub fn backend(ctx: &Ctx) -> FlistResult<Option<BackendDescriptor>> {
    get_json(ctx, FIELD_BACKEND)
}

pub fn set_backend(ctx: &Ctx, descriptor: &BackendDescriptor) -> FlistResult<()> {
    set_json(ctx, FIELD_BACKEND, descriptor)
}

/// Resolves backend connection info: catalog metadata first, falling back
/// to the `UPLOADBACKEND` environment variable (a JSON backend descriptor)
/// when the archive carries none, per the CLI's historical override.
pub fn backend_or_env(ctx: &Ctx) -> FlistResult<Option<BackendDescriptor>> {
    if let Some(descriptor) = backend(ctx)? {
        return Ok(Some(descriptor));
    }
    match std::env::var("UPLOADBACKEND") {
        Ok(value) => parse_backend_env(&value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_backend_env(value: &str) -> FlistResult<BackendDescriptor> {
    serde_json::from_str(value).map_err(|e| Error::InvalidPath {
        reason: format!("UPLOADBACKEND '{value}' is not a valid backend descriptor: {e}"),
    })
}

pub fn entrypoint(ctx: &Ctx) -> FlistResult<Option<String>> {
    get_json(ctx, FIELD_ENTRYPOINT)
}

pub fn set_entrypoint(ctx: &Ctx, value: &str) -> FlistResult<()> {
    set_json(ctx, FIELD_ENTRYPOINT, &value)
}

pub fn environ(ctx: &Ctx) -> FlistResult<Vec<String>> {
    Ok(get_json(ctx, FIELD_ENVIRON)?.unwrap_or_default())
}

pub fn set_environ(ctx: &Ctx, vars: &[String]) -> FlistResult<()> {
    set_json(ctx, FIELD_ENVIRON, &vars)
}

pub fn port(ctx: &Ctx) -> FlistResult<Vec<String>> {
    Ok(get_json(ctx, FIELD_PORT)?.unwrap_or_default())
}

pub fn set_port(ctx: &Ctx, mappings: &[String]) -> FlistResult<()> {
    set_json(ctx, FIELD_PORT, &mappings)
}

pub fn volume(ctx: &Ctx) -> FlistResult<Vec<String>> {
    Ok(get_json(ctx, FIELD_VOLUME)?.unwrap_or_default())
}

pub fn set_volume(ctx: &Ctx, mounts: &[String]) -> FlistResult<()> {
    set_json(ctx, FIELD_VOLUME, &mounts)
}

pub fn readme(ctx: &Ctx) -> FlistResult<Option<String>> {
    get_json(ctx, FIELD_README)
}

pub fn set_readme(ctx: &Ctx, text: &str) -> FlistResult<()> {
    set_json(ctx, FIELD_README, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> (Ctx, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = crate::catalog::Catalog::open(dir.path().join("flist.db")).unwrap();
        (Ctx::new(catalog), dir)
    }

    #[test]
    fn backend_round_trips() {
        let (ctx, _dir) = ctx();
        assert_eq!(backend(&ctx).unwrap(), None);
        let descriptor = BackendDescriptor {
            host: "hub.grid.tf".to_string(),
            port: 9900,
            namespace: "flist".to_string(),
        };
        set_backend(&ctx, &descriptor).unwrap();
        assert_eq!(backend(&ctx).unwrap(), Some(descriptor));
    }

    #[test]
    fn backend_or_env_falls_back_to_environment() {
        let (ctx, _dir) = ctx();
        unsafe {
            std::env::set_var(
                "UPLOADBACKEND",
                r#"{"host":"hub.grid.tf","port":9900,"namespace":"flist"}"#,
            )
        };
        let descriptor = backend_or_env(&ctx).unwrap().unwrap();
        assert_eq!(descriptor.host, "hub.grid.tf");
        assert_eq!(descriptor.port, 9900);
        assert_eq!(descriptor.namespace, "flist");
        unsafe { std::env::remove_var("UPLOADBACKEND") };
    }

    #[test]
    fn environ_defaults_to_empty() {
        let (ctx, _dir) = ctx();
        assert!(environ(&ctx).unwrap().is_empty());
        set_environ(&ctx, &["PATH=/bin".to_string()]).unwrap();
        assert_eq!(environ(&ctx).unwrap(), vec!["PATH=/bin".to_string()]);
    }
}
