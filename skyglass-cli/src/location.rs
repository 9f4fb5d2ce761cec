use async_trait::async_trait;
use skyglass_core::{
    Coordinate,
    location::{AuthorizationStatus, FixRequest, LocationBackend},
};

/// Terminal stand-in for device geolocation.
///
/// Coordinates passed on the command line behave as an authorized fix. Without them
/// there is nothing to locate with, which is reported as a denied permission so the
/// configured location policy decides what happens.
#[derive(Debug)]
pub struct ArgsLocation {
    coordinate: Option<Coordinate>,
}

impl ArgsLocation {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationBackend for ArgsLocation {
    fn authorization_status(&self) -> AuthorizationStatus {
        match self.coordinate {
            Some(_) => AuthorizationStatus::Authorized,
            None => AuthorizationStatus::Denied,
        }
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        self.authorization_status()
    }

    async fn request_fix(&self, _request: FixRequest) -> anyhow::Result<Option<Coordinate>> {
        Ok(self.coordinate)
    }
}
