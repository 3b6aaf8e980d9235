//! Test server management.
//!
//! Spawns and manages ignored instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    config_path: PathBuf,
    // Held so the database outlives restarts and is removed on drop.
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a test server with the default ignore settings.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with(port, "").await
    }

    /// Spawn a test server, appending `extra` (e.g. an `[ignore]` table) to
    /// the generated configuration.
    pub async fn spawn_with(port: u16, extra: &str) -> anyhow::Result<Self> {
        let data_dir = tempfile::Builder::new()
            .prefix(&format!("ignored-test-{}-", port))
            .tempdir()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test.server"
motd = "Test Server"

[listen]
address = "127.0.0.1:{}"

[database]
path = "{}"

{}
"#,
            port,
            data_dir.path().join("test.db").display(),
            extra
        );
        std::fs::write(&config_path, config_content)?;

        let child = Self::launch(&config_path)?;
        let server = Self {
            child,
            port,
            config_path,
            _data_dir: data_dir,
        };

        server.wait_until_ready().await?;
        Ok(server)
    }

    fn launch(config_path: &PathBuf) -> anyhow::Result<Child> {
        let child = Command::new(env!("CARGO_BIN_EXE_ignored"))
            .arg(config_path)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .spawn()?;
        Ok(child)
    }

    /// Kill the server and start it again on the same config and database.
    pub async fn restart(&mut self) -> anyhow::Result<()> {
        self.stop();
        self.child = Self::launch(&self.config_path)?;
        self.wait_until_ready().await
    }

    fn stop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Create a new logged-in test client.
    pub async fn connect(&self, name: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::login(&self.address(), name).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}
