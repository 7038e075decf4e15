//! Touch-feature collaborator
//!
//! A few display features are backed by nodes owned by a separate touch
//! service. The service is looked up by bus name the first time it is
//! needed and cached afterwards; a failed lookup is not cached, so the next
//! call tries again.

use std::future::Future;

use tokio::sync::OnceCell;
use zbus::proxy;

use crate::config::BusKind;

/// Touch panel index every request addresses
const TOUCH_ID: i32 = 0;

/// Remote touch-feature operations
pub trait TouchService: Send + Sync {
    fn read_node_file(
        &self,
        touch_id: i32,
        feature_id: i32,
    ) -> impl Future<Output = Result<String, TouchError>> + Send;

    fn write_node_file(
        &self,
        touch_id: i32,
        feature_id: i32,
        value: &str,
    ) -> impl Future<Output = Result<i32, TouchError>> + Send;
}

/// Finds the touch service
pub trait TouchLocator: Send + Sync {
    type Service: TouchService;

    fn locate(&self) -> impl Future<Output = Result<Self::Service, TouchError>> + Send;
}

/// Lazily connected touch-feature client
pub struct TouchFeatureClient<L: TouchLocator> {
    locator: L,
    service: OnceCell<L::Service>,
}

impl<L: TouchLocator> TouchFeatureClient<L> {
    pub fn new(locator: L) -> Self {
        Self {
            locator,
            service: OnceCell::new(),
        }
    }

    /// Whether the service has been found
    pub fn is_connected(&self) -> bool {
        self.service.initialized()
    }

    async fn service(&self) -> Result<&L::Service, TouchError> {
        self.service
            .get_or_try_init(|| async {
                let service = self.locator.locate().await;
                match &service {
                    Ok(_) => tracing::info!("Touch service located"),
                    Err(e) => tracing::warn!(error = %e, "Touch service lookup failed"),
                }
                service
            })
            .await
    }

    /// Read the node behind `feature_id`
    pub async fn read_node(&self, feature_id: i32) -> Result<String, TouchError> {
        let value = self.service().await?.read_node_file(TOUCH_ID, feature_id).await?;
        tracing::debug!(feature_id, value = %value, "Touch node read");
        Ok(value)
    }

    /// Write `value` to the node behind `feature_id`
    pub async fn write_node(&self, feature_id: i32, value: &str) -> Result<i32, TouchError> {
        let result = self
            .service()
            .await?
            .write_node_file(TOUCH_ID, feature_id, value)
            .await?;
        tracing::debug!(feature_id, value, result, "Touch node written");
        Ok(result)
    }
}

// ============================================================================
// D-Bus transport
// ============================================================================

/// Object path the touch service exports its interface at
pub const TOUCH_PATH: &str = "/org/hapticd/Touch";

#[proxy(
    interface = "org.hapticd.Touch",
    default_service = "org.hapticd.Touch",
    default_path = "/org/hapticd/Touch",
    gen_blocking = false
)]
pub trait Touch {
    fn read_node_file(&self, touch_id: i32, feature_id: i32) -> zbus::Result<String>;

    fn write_node_file(&self, touch_id: i32, feature_id: i32, value: &str) -> zbus::Result<i32>;
}

impl TouchService for TouchProxy<'static> {
    async fn read_node_file(&self, touch_id: i32, feature_id: i32) -> Result<String, TouchError> {
        Ok(TouchProxy::read_node_file(self, touch_id, feature_id).await?)
    }

    async fn write_node_file(
        &self,
        touch_id: i32,
        feature_id: i32,
        value: &str,
    ) -> Result<i32, TouchError> {
        Ok(TouchProxy::write_node_file(self, touch_id, feature_id, value).await?)
    }
}

/// Locates the touch service by bus name
#[derive(Debug, Clone)]
pub struct BusTouchLocator {
    bus: BusKind,
    service_name: String,
}

impl BusTouchLocator {
    pub fn new(bus: BusKind, service_name: impl Into<String>) -> Self {
        Self {
            bus,
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl TouchLocator for BusTouchLocator {
    type Service = TouchProxy<'static>;

    async fn locate(&self) -> Result<Self::Service, TouchError> {
        let connection = match self.bus {
            BusKind::System => zbus::Connection::system().await?,
            BusKind::Session => zbus::Connection::session().await?,
        };

        let name = zbus::names::BusName::try_from(self.service_name.clone())
            .map_err(|e| TouchError::InvalidName(e.to_string()))?;

        let dbus = zbus::fdo::DBusProxy::new(&connection).await?;
        if !dbus.name_has_owner(name.clone()).await? {
            return Err(TouchError::ServiceUnavailable(self.service_name.clone()));
        }

        let proxy = TouchProxy::builder(&connection)
            .destination(name)?
            .path(TOUCH_PATH)?
            .build()
            .await?;
        Ok(proxy)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Touch collaborator error type
#[derive(Debug)]
pub enum TouchError {
    /// Nobody owns the configured bus name
    ServiceUnavailable(String),
    /// Configured bus name is malformed
    InvalidName(String),
    /// Transport or remote error
    DBus(zbus::Error),
}

impl std::fmt::Display for TouchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TouchError::ServiceUnavailable(name) => {
                write!(f, "Touch service {} is not running", name)
            }
            TouchError::InvalidName(msg) => write!(f, "Invalid touch service name: {}", msg),
            TouchError::DBus(e) => write!(f, "D-Bus error: {}", e),
        }
    }
}

impl std::error::Error for TouchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TouchError::DBus(e) => Some(e),
            _ => None,
        }
    }
}

impl From<zbus::Error> for TouchError {
    fn from(e: zbus::Error) -> Self {
        TouchError::DBus(e)
    }
}

impl From<zbus::fdo::Error> for TouchError {
    fn from(e: zbus::fdo::Error) -> Self {
        TouchError::DBus(e.into())
    }
}
