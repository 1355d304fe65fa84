//! OPC UA server wiring.
//!
//! The `opcua` crate owns the listener, sessions, address space and the
//! polling timer. This module only registers the two variables and the poll
//! task with it.

use std::sync::Arc;

use log::info;
use opcua::server::prelude::*;
use opcua::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::error::ServerError;
use crate::poll::{PollTask, Sensor};
use crate::reading::ReadingStore;
use crate::variable::{Quantity, ReadStatus, VariableRead, VariableSource};

/// Namespace of the `temperature` and `humidity` nodes.
pub const NAMESPACE_INDEX: u16 = 1;

const LOCALE: &str = "en_US";

impl From<ReadStatus> for StatusCode {
    fn from(status: ReadStatus) -> Self {
        match status {
            ReadStatus::Good => StatusCode::Good,
            ReadStatus::BadTimeout => StatusCode::BadTimeout,
            ReadStatus::BadCommunicationError => StatusCode::BadCommunicationError,
            ReadStatus::BadNotFound => StatusCode::BadNotFound,
        }
    }
}

/// Node id of the variable exposing `quantity`.
pub fn node_id(quantity: Quantity) -> NodeId {
    NodeId::new(NAMESPACE_INDEX, quantity.name())
}

/// Converts a read into the value, source timestamp and status a client sees.
///
/// Before the first poll there is no timestamp; the OPC UA null date stands
/// in for it.
pub fn data_value(read: &VariableRead) -> DataValue {
    let source_timestamp = match read.source_timestamp {
        Some(at) => DateTime::from(at),
        None => DateTime::null(),
    };
    DataValue {
        value: Some(Variant::Float(read.value)),
        status: Some(read.status.into()),
        source_timestamp: Some(source_timestamp),
        source_picoseconds: None,
        server_timestamp: None,
        server_picoseconds: None,
    }
}

/// Adds one read-only Float variable per [`Quantity`] under the Objects
/// folder, each answering reads from `store`.
pub fn register_variables(
    address_space: &mut AddressSpace,
    store: &ReadingStore,
) -> Result<(), ServerError> {
    for quantity in Quantity::ALL {
        let name = quantity.name();
        let id = node_id(quantity);

        let inserted = VariableBuilder::new(
            &id,
            QualifiedName::new(NAMESPACE_INDEX, name),
            LocalizedText::new(LOCALE, name),
        )
        .description(LocalizedText::new(LOCALE, name))
        .data_type(DataTypeId::Float)
        .value(0f32)
        .organized_by(ObjectId::ObjectsFolder)
        .insert(address_space);
        if !inserted {
            return Err(ServerError::NodeInsert(name));
        }

        let variable = address_space
            .find_variable_mut(id.clone())
            .ok_or(ServerError::NodeInsert(name))?;

        // The requested range and timestamps are ignored; every read gets the
        // whole scalar with its source timestamp.
        let source = VariableSource::new(quantity, store.clone());
        let getter = AttrFnGetter::new(
            move |_, _, _, _, _, _| -> Result<Option<DataValue>, StatusCode> {
                Ok(Some(data_value(&source.read())))
            },
        );
        variable.set_value_getter(Arc::new(Mutex::new(getter)));
    }
    Ok(())
}

/// The OPC UA server with both variables and the poll task registered.
pub struct SensorServer {
    server: Arc<RwLock<Server>>,
}

impl SensorServer {
    pub fn new<S>(config: &Config, sensor: S) -> Result<Self, ServerError>
    where
        S: Sensor + Send + 'static,
    {
        let server_config = &config.server;
        let mut server = ServerBuilder::new_anonymous(server_config.application_name.clone())
            .application_uri(server_config.application_uri.clone())
            .product_uri(server_config.application_uri.clone())
            .host_and_port(server_config.host.clone(), server_config.port)
            .discovery_urls(vec![config.endpoint_url()])
            .pki_dir(server_config.pki_dir.clone())
            .create_sample_keypair(true)
            .server()
            .ok_or(ServerError::InvalidServerConfig)?;

        let store = ReadingStore::new();
        {
            let address_space = server.address_space();
            let mut address_space = address_space.write();
            register_variables(&mut address_space, &store)?;
        }

        // Polling actions are `Fn`; the mutex hands the task out one poll at a time.
        let task = Mutex::new(PollTask::new(sensor, store));
        server.add_polling_action(config.sensor.poll_interval_ms, move || {
            task.lock().run();
        });

        info!(
            "polling sensor every {} ms, serving ns={};s={} and ns={};s={} at {}",
            config.sensor.poll_interval_ms,
            NAMESPACE_INDEX,
            Quantity::Temperature.name(),
            NAMESPACE_INDEX,
            Quantity::Humidity.name(),
            config.endpoint_url()
        );

        Ok(Self {
            server: Arc::new(RwLock::new(server)),
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server: self.server.clone(),
        }
    }

    /// Serves clients until [`ShutdownHandle::shutdown`] is called.
    pub fn run(self) {
        Server::run_server(self.server);
    }
}

/// Stops a running [`SensorServer`] from another thread or a signal handler.
#[derive(Clone)]
pub struct ShutdownHandle {
    server: Arc<RwLock<Server>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.server.write().abort();
    }
}
