use crate::types::{FetchOutput, Resource};
use crate::utils::parse_resource_line;
use anyhow::Context;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::Command;
use tracing::{debug, info};

/// How to invoke kubectl: the binary, arguments placed before every
/// subcommand (e.g. `--kubeconfig=...`) and an optional context.
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
    global_args: Vec<OsString>,
    context: Option<String>,
}

impl Kubectl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            global_args: Vec::new(),
            context: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.global_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_kubeconfig(self, path: &Path) -> Self {
        let mut arg = OsString::from("--kubeconfig=");
        arg.push(path);
        self.with_args([arg])
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    fn args(&self, subcommand: &[&str]) -> Vec<OsString> {
        let mut args = self.global_args.clone();
        args.extend(subcommand.iter().map(|s| OsString::from(*s)));
        if let Some(ctx) = &self.context {
            args.push("--context".into());
            args.push(ctx.into());
        }
        args
    }

    /// `api-resources` without the header row. The header
    /// (`NAME SHORTNAMES APIVERSION NAMESPACED KIND`) has five columns, so
    /// [`parse_resource_line`] would accept it as a resource named `NAME`.
    pub fn api_resources_args(&self) -> Vec<OsString> {
        self.args(&["api-resources", "--no-headers"])
    }

    pub fn get_all_namespaces_args(&self, resource_name: &str) -> Vec<OsString> {
        self.args(&["get", "--all-namespaces", resource_name])
    }

    pub fn command_line(&self, args: &[OsString]) -> String {
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
        format!("{} {}", self.program, args.join(" "))
    }

    fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

/// Run `kubectl api-resources` and parse every usable line.
///
/// Any failure here is fatal for the run: without the listing there is
/// nothing to fetch.
pub async fn list_resources(kubectl: &Kubectl) -> anyhow::Result<Vec<Resource>> {
    let args = kubectl.api_resources_args();
    let command_line = kubectl.command_line(&args);
    debug!("Running command: {}", command_line);

    let mut child = kubectl
        .command(&args)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("Error starting command: {}", command_line))?;
    let stdout = child
        .stdout
        .take()
        .context("Error creating stdout pipe")?;

    let mut resources = Vec::new();
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Error reading api-resources output")?;
        if read == 0 {
            break;
        }
        // A resource name that isn't UTF-8 can't be passed back to kubectl.
        let Ok(line) = std::str::from_utf8(&buf) else {
            debug!(
                "Skipping undecodable api-resources line: {}",
                String::from_utf8_lossy(&buf).trim_end()
            );
            continue;
        };
        match parse_resource_line(line) {
            Some(resource) => {
                debug!(
                    "Found {} ({}, kind {}, short names {}, namespaced: {})",
                    resource.name,
                    resource.api_version,
                    resource.kind,
                    resource.short_names.as_deref().unwrap_or("-"),
                    resource.namespaced
                );
                resources.push(resource);
            }
            None if !line.trim().is_empty() => {
                debug!("Skipping api-resources line: {}", line.trim_end());
            }
            None => {}
        }
    }

    let status = child.wait().await.context("Error waiting for command")?;
    if !status.success() {
        anyhow::bail!("Command `{}` failed: {}", command_line, status);
    }

    Ok(resources)
}

pub fn resource_log_path(output_dir: &Path, resource_name: &str) -> PathBuf {
    output_dir.join(format!("{}.log", resource_name))
}

/// Fetch every object of `resource` across all namespaces into
/// `<output_dir>/<name>.log`.
///
/// Never fails: problems are reported through [`FetchOutput::error`] so one
/// broken resource type doesn't take the batch down with it.
pub async fn fetch_resource(kubectl: &Kubectl, resource: &Resource, output_dir: &Path) -> FetchOutput {
    let args = kubectl.get_all_namespaces_args(&resource.name);
    let command_log = format!("Running command: {}\n", kubectl.command_line(&args));
    let path = resource_log_path(output_dir, &resource.name);

    let mut output = FetchOutput {
        resource_name: resource.name.clone(),
        command_log,
        error: None,
    };

    match write_resource_log(kubectl, &args, &output.command_log, output_dir, &path).await {
        Ok(()) => info!("Writing {}", path.display()),
        Err(e) => output.error = Some(format!("{:#}", e)),
    }

    output
}

async fn write_resource_log(
    kubectl: &Kubectl,
    args: &[OsString],
    command_log: &str,
    output_dir: &Path,
    path: &Path,
) -> anyhow::Result<()> {
    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("error creating output directory {}", output_dir.display()))?;

    let file = File::create(path)
        .await
        .with_context(|| format!("error creating file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    // Whatever made it into the buffer is kept even when the command fails.
    let streamed = stream_command_output(kubectl, args, command_log, &mut writer).await;
    let flushed = writer
        .flush()
        .await
        .with_context(|| format!("error writing to file {}", path.display()));
    streamed.and(flushed)
}

async fn stream_command_output(
    kubectl: &Kubectl,
    args: &[OsString],
    command_log: &str,
    writer: &mut BufWriter<File>,
) -> anyhow::Result<()> {
    writer
        .write_all(command_log.as_bytes())
        .await
        .context("error writing command log")?;

    let mut child = kubectl
        .command(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("error starting command")?;
    let mut stdout = child
        .stdout
        .take()
        .context("error creating stdout pipe")?;
    let mut stderr = child
        .stderr
        .take()
        .context("error creating stderr pipe")?;

    // stdout goes straight to the file, stderr is held back until stdout hits
    // EOF. Both pipes are drained at the same time so the child never blocks
    // on a full stderr pipe.
    let mut stderr_buf = Vec::new();
    let (copied, _) = tokio::try_join!(
        async {
            tokio::io::copy(&mut stdout, &mut *writer)
                .await
                .context("error copying stdout to file")
        },
        async {
            stderr
                .read_to_end(&mut stderr_buf)
                .await
                .context("error reading stderr")
        },
    )?;
    debug!(
        "{}: {} bytes of stdout, {} bytes of stderr",
        kubectl.command_line(args),
        copied,
        stderr_buf.len()
    );

    writer
        .write_all(&stderr_buf)
        .await
        .context("error copying stderr to file")?;

    let status = child.wait().await.context("error waiting for command")?;
    if !status.success() {
        anyhow::bail!("`{}` failed: {}", kubectl.command_line(args), status);
    }

    Ok(())
}
