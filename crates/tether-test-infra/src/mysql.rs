use std::time::Duration;

use crate::{ipv4_host, Result, TestInfraError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;

/// Settings for a throwaway MySQL server and the pool opened against it.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = String::from("8.4"), setter(into))]
    image_tag: String,
    #[builder(default = String::from("tether"), setter(into))]
    database: String,
    #[builder(default = String::from("tether"), setter(into))]
    username: String,
    #[builder(default = String::from("tether"), setter(into))]
    password: String,
    #[builder(default = 8)]
    max_connections: u32,
    /// The server logs readiness before its socket accepts logins, so
    /// connecting is retried this many times.
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    connect_backoff: Duration,
}

impl MysqlConfig {
    fn url_for(&self, host: &str, port: u16) -> String {
        format!(
            "mysql://{}:{}@{host}:{port}/{}",
            self.username, self.password, self.database
        )
    }
}

/// A MySQL container that lives as long as this value.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.image_tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_RANDOM_ROOT_PASSWORD", "yes")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    pub async fn host(&self) -> Result<String> {
        Ok(ipv4_host(self.container.get_host().await?))
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(MYSQL_PORT).await?)
    }

    pub async fn database_url(&self) -> Result<String> {
        let host = self.host().await?;
        let port = self.port().await?;
        Ok(self.config.url_for(&host, port))
    }

    /// Opens a pool once the server accepts logins.
    pub async fn connect(&self) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let attempts = self.config.connect_attempts.max(1);

        let mut attempt = 1;
        loop {
            let connected = MySqlPoolOptions::new()
                .max_connections(self.config.max_connections)
                .connect(&url)
                .await;
            match connected {
                Ok(pool) => return Ok(pool),
                Err(source) if attempt >= attempts => {
                    return Err(TestInfraError::NotReady {
                        service: "mysql",
                        attempts,
                        source,
                    });
                }
                Err(_) => {
                    attempt += 1;
                    tokio::time::sleep(self.config.connect_backoff).await;
                }
            }
        }
    }
}
