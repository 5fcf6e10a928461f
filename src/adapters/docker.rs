use crate::domain::model::{ContainerId, ContainerPort, ContainerSpec};
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::{HarnessError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

const HARNESS_LABEL: &str = "org.twisp.harness=true";

/// 透過 `docker` CLI 管理容器
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// 例如 `podman`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn output(&self, args: &[&str]) -> Result<String> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        tracing::debug!("🐳 {}", command_line);

        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| HarnessError::Container {
                message: format!("running `{}`: {}", command_line, e),
            })?;

        if !output.status.success() {
            return Err(HarnessError::Container {
                message: format!(
                    "`{}` exited with {}: {}",
                    command_line,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let ports: Vec<String> = spec
            .exposed_ports
            .iter()
            .map(|p| p.number().to_string())
            .collect();

        let mut args = vec!["run", "-d", "--label", HARNESS_LABEL];
        for port in &ports {
            args.push("-p");
            args.push(port);
        }
        args.push(&spec.image);

        let stdout = self.output(&args).await?;
        // pull 時 stdout 可能有其他訊息，container id 在最後一行
        let id = stdout.lines().last().unwrap_or_default().trim().to_string();
        if id.is_empty() {
            return Err(HarnessError::Container {
                message: format!("`docker run {}` printed no container id", spec.image),
            });
        }
        Ok(ContainerId(id))
    }

    async fn host(&self, _id: &ContainerId) -> Result<String> {
        Ok(docker_host_from_env(std::env::var("DOCKER_HOST").ok().as_deref()))
    }

    async fn mapped_port(&self, id: &ContainerId, port: ContainerPort) -> Result<u16> {
        let port_spec = port.to_string();
        let stdout = self.output(&["port", id.0.as_str(), port_spec.as_str()]).await?;
        parse_port_output(&stdout).ok_or_else(|| HarnessError::Container {
            message: format!("no host mapping for {} in {:?}", port, stdout),
        })
    }

    async fn follow_logs(&self, id: &ContainerId) -> Result<mpsc::UnboundedReceiver<Vec<u8>>> {
        let mut child = Command::new(&self.program)
            .args(["logs", "-f", id.0.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Container {
                message: format!("following logs of {}: {}", id, e),
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_lines(stderr, tx));
        }
        // 容器刪除後 `docker logs -f` 會自行結束
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok(rx)
    }

    async fn terminate(&self, id: &ContainerId) -> Result<()> {
        self.output(&["rm", "-f", "-v", id.0.as_str()]).await?;
        tracing::info!("🧹 Removed container {}", id);
        Ok(())
    }

    fn terminate_detached(&self, id: &ContainerId) {
        let spawned = std::process::Command::new(&self.program)
            .args(["rm", "-f", "-v", id.0.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            tracing::warn!("⚠️ Could not remove container {}: {}", id, e);
        }
    }
}

async fn pump_lines<R>(reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut content = line.into_bytes();
        content.push(b'\n');
        if tx.send(content).is_err() {
            break;
        }
    }
}

/// `DOCKER_HOST=tcp://10.0.0.5:2376` 時連到該 host，其餘情況用 localhost
fn docker_host_from_env(docker_host: Option<&str>) -> String {
    docker_host
        .and_then(|raw| url::Url::parse(raw).ok())
        .filter(|url| url.scheme() == "tcp")
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string())
}

/// 解析 `docker port` 輸出，例如 `0.0.0.0:49153` 或 `[::]:49153`
fn parse_port_output(stdout: &str) -> Option<u16> {
    stdout
        .lines()
        .filter_map(|line| line.trim().rsplit_once(':'))
        .find_map(|(_, port)| port.parse().ok())
}
