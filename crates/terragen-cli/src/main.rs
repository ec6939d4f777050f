//! `tgrpc`: drive a running Terragen instance from the command line.
//!
//! Every subcommand is a handful of RPC calls through [`Scene`]. Nodes are
//! addressed by path (`/Render Camera`) and resolved to ids first.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use terragen_rpc::{ClientConfig, ErrorCategory, LowLevelErrorKind, RpcClient};
use terragen_scene::{Scene, SceneError};
use terragen_types::NodeId;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const TIMEOUT_HINT: &str = "\
The Terragen RPC server did not answer in time. Terragen may be busy (a file \
dialog or a render can block it), or a stale process may be holding the port.";

/// Terragen RPC client
#[derive(Parser, Debug)]
#[command(name = "tgrpc")]
#[command(about = "Query and edit a running Terragen project over RPC")]
#[command(version)]
#[command(after_help = "\
Examples:
  tgrpc root                                   Print the root node id
  tgrpc children / --class camera              List cameras at the top level
  tgrpc get \"/Render Camera\" position          Read a parameter
  tgrpc set \"/Render Camera\" position \"0 100 -250\"
  tgrpc call node_by_path '[\"/Sunlight 01\"]'   Raw JSON-RPC call
  tgrpc check                                  Check server error handling

Connection settings come from the config file, then TERRAGEN_RPC_HOST,
TERRAGEN_RPC_PORT and TERRAGEN_RPC_TIMEOUT, then the flags below.
")]
struct Cli {
    /// Server host
    #[arg(long, global = true, value_name = "HOST")]
    host: Option<String>,

    /// Server port
    #[arg(long, global = true, value_name = "PORT")]
    port: Option<u16>,

    /// Timeout for each socket operation, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<f64>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log every RPC call
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call any method with a JSON array of positional params
    Call {
        method: String,
        /// e.g. '["/Render Camera"]'
        params: Option<String>,
    },

    /// Print the root node id
    Root,

    /// Print the id of the node at a path
    Find { path: String },

    /// List the children of a node
    Children {
        path: String,
        /// Only children of exactly this class
        #[arg(long, value_name = "CLASS")]
        class: Option<String>,
    },

    /// List a node's parameters and their values
    Params { path: String },

    /// Print one parameter as Terragen stores it
    Get { path: String, param: String },

    /// Set one parameter from its string form
    Set {
        path: String,
        param: String,
        value: String,
    },

    /// Replace the UI selection
    Select {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Clear the UI selection
    SelectNone,

    /// Create a node of CLASS under PARENT_PATH
    Create { parent_path: String, class: String },

    /// Delete the node at a path
    Delete { path: String },

    /// Discard the current project and start a new one
    New,

    /// Discard the current project and open a file
    Open { file: String },

    /// Save the project to a file
    Save { file: String },

    /// Print the current project's file path
    Project,

    /// Check connectivity and the server's handling of malformed requests
    Check,
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn setup_logging(verbose: bool) {
    let default_directive = if verbose {
        "tgrpc=debug,terragen_rpc=debug,terragen_scene=debug"
    } else {
        "tgrpc=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::resolve(cli.config.as_deref())
        .context("Failed to load client configuration")?;

    if let Some(host) = &cli.host {
        config.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    config.validate().context("Invalid connection settings")?;

    debug!(host = %config.host, port = config.port, timeout_secs = config.timeout_secs, "Resolved config");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = load_config(&cli)?;
    let scene = Scene::new(RpcClient::with_config(config));

    run(cli.command, &scene).await.map_err(with_timeout_hint)
}

async fn run(command: Commands, scene: &Scene) -> Result<()> {
    match command {
        Commands::Call { method, params } => run_call(scene, &method, params.as_deref()).await,
        Commands::Root => run_root(scene).await,
        Commands::Find { path } => run_find(scene, &path).await,
        Commands::Children { path, class } => run_children(scene, &path, class.as_deref()).await,
        Commands::Params { path } => run_params(scene, &path).await,
        Commands::Get { path, param } => run_get(scene, &path, &param).await,
        Commands::Set { path, param, value } => run_set(scene, &path, &param, &value).await,
        Commands::Select { paths } => run_select(scene, &paths).await,
        Commands::SelectNone => scene.select_none().await.context("Select none failed"),
        Commands::Create { parent_path, class } => run_create(scene, &parent_path, &class).await,
        Commands::Delete { path } => run_delete(scene, &path).await,
        Commands::New => scene
            .new_project()
            .await
            .context("New project command failed"),
        Commands::Open { file } => run_open(scene, &file).await,
        Commands::Save { file } => run_save(scene, &file).await,
        Commands::Project => run_project(scene).await,
        Commands::Check => run_check(scene).await,
    }
}

/// Put the timeout hint in front of errors caused by a timeout.
fn with_timeout_hint(err: anyhow::Error) -> anyhow::Error {
    let timed_out = err.chain().any(|cause| {
        cause
            .downcast_ref::<terragen_rpc::Error>()
            .is_some_and(terragen_rpc::Error::is_timeout)
            || cause
                .downcast_ref::<SceneError>()
                .and_then(SceneError::as_rpc)
                .is_some_and(terragen_rpc::Error::is_timeout)
    });

    if timed_out {
        err.context(TIMEOUT_HINT)
    } else {
        err
    }
}

fn parse_params(raw: Option<&str>) -> Result<Vec<Value>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(raw).context("Params must be valid JSON")? {
        Value::Array(params) => Ok(params),
        other => bail!("Params must be a JSON array, got {other}"),
    }
}

async fn resolve(scene: &Scene, path: &str) -> Result<NodeId> {
    scene
        .node_by_path(path)
        .await
        .with_context(|| format!("Lookup of '{path}' failed"))?
        .with_context(|| format!("No node at path '{path}'"))
}

async fn run_call(scene: &Scene, method: &str, params: Option<&str>) -> Result<()> {
    let params = parse_params(params)?;
    let reply = scene
        .client()
        .call(method, params)
        .await
        .with_context(|| format!("Call to '{method}' failed"))?;

    println!("{}", serde_json::to_string_pretty(&reply.value)?);
    Ok(())
}

async fn run_root(scene: &Scene) -> Result<()> {
    match scene.root().await.context("Root command failed")? {
        Some(root) => println!("{root}"),
        None => bail!("Server reported no root node"),
    }
    Ok(())
}

async fn run_find(scene: &Scene, path: &str) -> Result<()> {
    let node = resolve(scene, path).await?;
    println!("{node}");
    Ok(())
}

async fn run_children(scene: &Scene, path: &str, class: Option<&str>) -> Result<()> {
    let parent = resolve(scene, path).await?;
    let children = match class {
        Some(class) => scene.children_filtered_by_class(&parent, class).await,
        None => scene.children(&parent).await,
    }
    .context("Children command failed")?;

    for child in &children {
        let child_path = scene
            .path(child)
            .await
            .with_context(|| format!("Failed to get path of node {child}"))?;
        println!("{child}\t{child_path}");
    }
    info!("{} children", children.len());
    Ok(())
}

async fn run_params(scene: &Scene, path: &str) -> Result<()> {
    let node = resolve(scene, path).await?;
    let names = scene
        .param_names(&node)
        .await
        .context("Params command failed")?;

    for name in names {
        let value = scene
            .get_param_as_string(&node, &name)
            .await
            .with_context(|| format!("Failed to read '{name}'"))?;
        println!("{name} = {value}");
    }
    Ok(())
}

async fn run_get(scene: &Scene, path: &str, param: &str) -> Result<()> {
    let node = resolve(scene, path).await?;
    let value = scene
        .get_param_as_string(&node, param)
        .await
        .with_context(|| format!("Failed to read '{param}' of '{path}'"))?;
    println!("{value}");
    Ok(())
}

async fn run_set(scene: &Scene, path: &str, param: &str, value: &str) -> Result<()> {
    let node = resolve(scene, path).await?;
    scene
        .set_param_from_string(&node, param, value)
        .await
        .with_context(|| format!("Failed to set '{param}' of '{path}'"))?;
    info!("Set {path} {param} = {value}");
    Ok(())
}

async fn run_select(scene: &Scene, paths: &[String]) -> Result<()> {
    let mut nodes = Vec::with_capacity(paths.len());
    for path in paths {
        nodes.push(resolve(scene, path).await?);
    }
    scene
        .select_just(&nodes)
        .await
        .context("Select command failed")
}

async fn run_create(scene: &Scene, parent_path: &str, class: &str) -> Result<()> {
    let parent = resolve(scene, parent_path).await?;
    let Some(node) = scene
        .create_child(&parent, class)
        .await
        .context("Create command failed")?
    else {
        bail!("Terragen did not create a '{class}' node under '{parent_path}'");
    };

    let path = scene.path(&node).await.context("Failed to get new node's path")?;
    println!("{node}\t{path}");
    Ok(())
}

async fn run_delete(scene: &Scene, path: &str) -> Result<()> {
    let node = resolve(scene, path).await?;
    scene.delete(&node).await.context("Delete command failed")?;
    info!("Deleted {path}");
    Ok(())
}

async fn run_open(scene: &Scene, file: &str) -> Result<()> {
    if !scene
        .open_project(file)
        .await
        .context("Open command failed")?
    {
        bail!("Terragen could not open '{file}'");
    }
    Ok(())
}

async fn run_save(scene: &Scene, file: &str) -> Result<()> {
    if !scene
        .save_project(file)
        .await
        .context("Save command failed")?
    {
        bail!("Terragen could not save to '{file}'");
    }
    Ok(())
}

async fn run_project(scene: &Scene) -> Result<()> {
    let path = scene
        .project_filepath()
        .await
        .context("Project command failed")?;
    println!("{path}");
    Ok(())
}

/// One root call, then one malformed payload of each kind. The malformed
/// ones pass when the server answers with the matching error code.
async fn run_check(scene: &Scene) -> Result<()> {
    let root = scene.root().await.context("Server did not answer 'root'")?;
    println!(
        "root: ok ({})",
        root.as_ref().map_or_else(|| "none".to_string(), NodeId::to_string)
    );

    let client = scene.client();
    let malformed = [
        (
            "invalid json",
            client.call_with_invalid_json().await,
            LowLevelErrorKind::ParseError,
        ),
        (
            "invalid request",
            client.call_with_invalid_request().await,
            LowLevelErrorKind::InvalidRequest,
        ),
    ];

    let mut failures = 0;
    for (name, outcome, expected) in malformed {
        match outcome {
            Err(e) if e.category() == ErrorCategory::LowLevel(expected) => {
                println!("{name}: ok ({expected})");
            }
            Err(e) if e.is_transport() => return Err(e).context(format!("Check '{name}' failed")),
            Err(e) => {
                failures += 1;
                println!("{name}: unexpected error: {e}");
            }
            Ok(reply) => {
                failures += 1;
                println!("{name}: accepted, server replied {}", reply.into_value());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} check(s) failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use futures_util::StreamExt;
    use serde_json::json;
    use std::time::Duration;
    use terragen_rpc::LengthPrefixCodec;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_util::codec::FramedRead;

    /// Serve one reply per connection, built from the raw request frame.
    async fn serve(reply: fn(&[u8]) -> Value) -> (Scene, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let mut framed = FramedRead::new(socket, LengthPrefixCodec::new());
                let Some(Ok(frame)) = framed.next().await else {
                    continue;
                };
                let body = serde_json::to_vec(&reply(&frame)).unwrap();
                let mut socket = framed.into_inner();
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });

        let scene = Scene::new(RpcClient::with_config(ClientConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout_secs: 5.0,
        }));
        (scene, task)
    }

    fn accept_anything(_frame: &[u8]) -> Value {
        json!({"jsonrpc": "2.0", "result": "1", "id": null})
    }

    fn compliant(frame: &[u8]) -> Value {
        let error = |code: i64, message: &str| {
            json!({"jsonrpc": "2.0", "error": {"code": code, "message": message}, "id": null})
        };
        match serde_json::from_slice::<Value>(frame) {
            Err(_) => error(-32700, "Parse error"),
            Ok(request) => match request.get("method") {
                None => error(-32600, "Invalid Request"),
                Some(_) => json!({"jsonrpc": "2.0", "result": "1", "id": request["id"]}),
            },
        }
    }

    #[tokio::test]
    async fn test_check_fails_when_server_accepts_malformed_requests() {
        let (scene, task) = serve(accept_anything).await;

        let err = run_check(&scene).await.unwrap_err();

        assert_eq!(err.to_string(), "2 check(s) failed");
        task.abort();
    }

    #[tokio::test]
    async fn test_check_passes_against_compliant_server() {
        let (scene, task) = serve(compliant).await;

        run_check(&scene).await.unwrap();

        task.abort();
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tgrpc",
            "get",
            "/Render Camera",
            "fov_angle",
            "--port",
            "4000",
            "--timeout",
            "2.5",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(4000));
        assert_eq!(cli.timeout, Some(2.5));
        assert!(matches!(
            cli.command,
            Commands::Get { ref path, ref param } if path == "/Render Camera" && param == "fov_angle"
        ));
    }

    #[test]
    fn test_children_class_filter() {
        let cli = Cli::try_parse_from(["tgrpc", "children", "/", "--class", "camera"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Children { class: Some(ref c), .. } if c == "camera"
        ));
    }

    #[test]
    fn test_select_requires_a_path() {
        assert!(Cli::try_parse_from(["tgrpc", "select"]).is_err());
        let cli = Cli::try_parse_from(["tgrpc", "select", "/A", "/B"]).unwrap();
        assert!(matches!(cli.command, Commands::Select { ref paths } if paths.len() == 2));
    }

    #[test]
    fn test_kebab_case_subcommand() {
        let cli = Cli::try_parse_from(["tgrpc", "select-none", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::SelectNone));
    }

    #[test]
    fn test_parse_params() {
        assert!(parse_params(None).unwrap().is_empty());
        assert_eq!(
            parse_params(Some(r#"["/Render Camera", 3]"#)).unwrap(),
            vec![json!("/Render Camera"), json!(3)]
        );
        assert!(parse_params(Some("{\"a\": 1}")).is_err());
        assert!(parse_params(Some("[1,")).is_err());
    }

    #[test]
    fn test_timeout_hint_added_for_timeouts() {
        let err = anyhow::Error::new(terragen_rpc::Error::Timeout(Duration::from_secs(10)))
            .context("Root command failed");
        let hinted = with_timeout_hint(err);
        assert_eq!(hinted.to_string(), TIMEOUT_HINT);

        let err = anyhow::Error::new(SceneError::from(terragen_rpc::Error::Timeout(
            Duration::from_secs(1),
        )));
        assert_eq!(with_timeout_hint(err).to_string(), TIMEOUT_HINT);
    }

    #[test]
    fn test_timeout_hint_skipped_for_other_errors() {
        let err = anyhow::anyhow!("No node at path '/x'");
        assert_eq!(with_timeout_hint(err).to_string(), "No node at path '/x'");
    }
}
