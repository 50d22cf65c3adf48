use std::env;
use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use foundation::params::VendorParams;
use foundation::srs::WGS84;
use layers::layer::ResourceDescriptor;
use layers::point::MapPoint;
use layers::query::{PointQueryContext, QueryDefaults, QueryRequestBuilder};
use security::credentials::CredentialStore;
use security::policy::can_edit;
use security::principal::Principal;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use streaming::identify::IdentifyFlow;
use streaming::service::FeatureService;
use streaming::wfs::{HttpFeatureService, DEFAULT_WFS_VERSION};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Identify features and check edit rights on map resources")]
struct Args {
    /// WFS version sent on describe and feature requests (env WFS_VERSION)
    #[arg(long)]
    wfs_version: Option<String>,

    /// JSON file with per-source credentials
    #[arg(long)]
    credentials: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the features of a resource under a map point
    Identify {
        /// JSON resource descriptor
        #[arg(long)]
        resource: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Map projection, e.g. EPSG:3857
        #[arg(long)]
        projection: Option<String>,

        /// Locale used to pick the resource title
        #[arg(long)]
        locale: Option<String>,

        /// Result cap (env IDENTIFY_MAX_ITEMS)
        #[arg(long)]
        max_items: Option<usize>,

        /// Extra vendor parameter as KEY=VALUE; repeatable
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Requested info format, e.g. text/html
        #[arg(long)]
        info_format: Option<String>,
    },

    /// Print the geometry attribute of a feature type
    Describe {
        #[arg(long)]
        url: String,

        #[arg(long)]
        type_name: String,
    },

    /// Evaluate whether a principal may edit a resource
    CanEdit {
        /// JSON resource descriptor
        #[arg(long)]
        resource: String,

        /// JSON principal; anonymous when omitted
        #[arg(long)]
        principal: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let wfs_version = args.wfs_version.unwrap_or_else(|| {
        env::var("WFS_VERSION").unwrap_or_else(|_| DEFAULT_WFS_VERSION.to_string())
    });
    let credentials = match &args.credentials {
        Some(path) => read_json::<CredentialStore>(path).await?,
        None => CredentialStore::new(),
    };
    let credentials = Arc::new(credentials);
    let service = Arc::new(HttpFeatureService::new().with_version(wfs_version));

    match args.command {
        Command::Identify {
            resource,
            lat,
            lng,
            projection,
            locale,
            max_items,
            params,
            info_format,
        } => {
            let resource: ResourceDescriptor = read_json(&resource).await?;
            let mut ctx = PointQueryContext::new(MapPoint::new(lat, lng));
            if let Some(projection) = projection {
                ctx = ctx.with_projection(projection);
            }
            if let Some(locale) = locale {
                ctx = ctx.with_locale(locale);
            }
            ctx.max_items = max_items;
            ctx.params = vendor_params(params);
            identify(service, credentials, &resource, &ctx, info_format.as_deref()).await?
        }
        Command::Describe { url, type_name } => {
            let description = service.describe_feature_type(&url, &type_name).await?;
            match description.geometry_attribute() {
                Some(attribute) => println!("{attribute}"),
                None => return Err(format!("{type_name} has no geometry attribute").into()),
            }
        }
        Command::CanEdit {
            resource,
            principal,
        } => {
            let resource: ResourceDescriptor = read_json(&resource).await?;
            let principal: Option<Principal> = match principal {
                Some(path) => Some(read_json(&path).await?),
                None => None,
            };
            let allowed = can_edit(&resource.permissions, principal.as_ref());
            info!(resource = %resource.id, allowed, "edit permission evaluated");
            println!("{}", json!({ "resource": resource.id, "canEdit": allowed }));
        }
    }

    Ok(())
}

async fn identify(
    service: Arc<HttpFeatureService>,
    credentials: Arc<CredentialStore>,
    resource: &ResourceDescriptor,
    ctx: &PointQueryContext,
    info_format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let builder = QueryRequestBuilder::new(Arc::clone(&credentials)).with_defaults(query_defaults());
    let built = builder.build(resource, ctx, info_format, None, None);
    let title = built.metadata.title.clone();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling identify");
            interrupt.cancel();
        }
    });

    let flow = IdentifyFlow::new(service, credentials);
    let collection = flow.run_built(resource, built, &cancel).await?;
    info!(resource = %resource.id, count = collection.len(), "identify finished");

    let out = json!({
        "resource": resource.id,
        "title": title,
        "result": collection,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn query_defaults() -> QueryDefaults {
    QueryDefaults {
        max_items: env_var_usize("IDENTIFY_MAX_ITEMS", QueryDefaults::default().max_items),
        srs: env::var("IDENTIFY_DEFAULT_SRS").unwrap_or_else(|_| WGS84.to_string()),
    }
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

async fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("reading {}: {e}", path.display()))?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| format!("parsing {}: {e}", path.display()))?;
    Ok(value)
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn vendor_params(pairs: Vec<(String, String)>) -> VendorParams {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_key_value_params() {
        assert_eq!(
            parse_param("CQL_FILTER=NAME='Lake'").unwrap(),
            ("CQL_FILTER".to_string(), "NAME='Lake'".to_string())
        );
        assert_eq!(
            parse_param("viewparams=").unwrap(),
            ("viewparams".to_string(), String::new())
        );
    }

    #[test]
    fn rejects_params_without_key() {
        assert!(parse_param("=value").is_err());
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn later_params_override_earlier_ones() {
        let params = vendor_params(vec![
            ("STYLES".to_string(), "a".to_string()),
            ("STYLES".to_string(), "b".to_string()),
        ]);
        assert_eq!(params.len(), 1);
        assert_eq!(params["STYLES"], Value::String("b".to_string()));
    }

    #[test]
    fn cli_accepts_negative_coordinates() {
        let args = Args::try_parse_from([
            "identify",
            "identify",
            "--resource",
            "roads.json",
            "--lat",
            "-33.9",
            "--lng",
            "-190.5",
            "--param",
            "STYLES=thin",
        ])
        .unwrap();
        match args.command {
            Command::Identify {
                lat, lng, params, ..
            } => {
                assert_eq!(lat, -33.9);
                assert_eq!(lng, -190.5);
                assert_eq!(params, vec![("STYLES".to_string(), "thin".to_string())]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
