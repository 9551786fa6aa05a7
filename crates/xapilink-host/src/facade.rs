use std::time::Duration;

use xapilink_codec::{DecodedValue, Value};

use crate::error::{HostError, Result};
use crate::link::Link;

impl Link {
    /// Handle onto one device of the loaded definitions.
    pub fn device<'a>(&'a self, name: &str) -> Result<DeviceHandle<'a>> {
        if self.schema().device(name).is_none() {
            return Err(HostError::UnknownDevice(name.to_string()));
        }
        Ok(DeviceHandle {
            link: self,
            device: name.to_string(),
        })
    }
}

/// Named handle onto one device, for chained invocation:
/// `link.device("bt")?.class("system")?.invoke("hello", &[])`.
#[derive(Debug)]
pub struct DeviceHandle<'a> {
    link: &'a Link,
    device: String,
}

impl<'a> DeviceHandle<'a> {
    pub fn name(&self) -> &str {
        &self.device
    }

    pub fn class(&self, name: &str) -> Result<ClassHandle<'a>> {
        let device_schema = self
            .link
            .schema()
            .device(&self.device)
            .ok_or_else(|| HostError::UnknownDevice(self.device.clone()))?;
        if device_schema.class(name).is_none() {
            return Err(HostError::UnknownClass {
                device: self.device.clone(),
                class: name.to_string(),
            });
        }
        Ok(ClassHandle {
            link: self.link,
            device: self.device.clone(),
            class: name.to_string(),
        })
    }
}

/// Named handle onto one command class of a device.
#[derive(Debug)]
pub struct ClassHandle<'a> {
    link: &'a Link,
    device: String,
    class: String,
}

impl ClassHandle<'_> {
    pub fn name(&self) -> &str {
        &self.class
    }

    pub fn invoke(&self, command: &str, args: &[Value]) -> Result<DecodedValue> {
        self.link.call(&self.device, &self.class, command, args)
    }

    pub fn invoke_with_timeout(
        &self,
        command: &str,
        args: &[Value],
        timeout: Duration,
    ) -> Result<DecodedValue> {
        self.link
            .call_with_timeout(&self.device, &self.class, command, args, timeout)
    }
}
