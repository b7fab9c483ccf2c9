use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use crate::ssm_errors::SSMResult;
use crate::ssm_ops::ParameterService;

/// Builds a client for a region/profile pair.
pub trait ClientFactory {
    fn create(&self, region: &str, profile: &str) -> SSMResult<Rc<dyn ParameterService>>;
}

impl<F> ClientFactory for F
where
    F: Fn(&str, &str) -> SSMResult<Rc<dyn ParameterService>>,
{
    fn create(&self, region: &str, profile: &str) -> SSMResult<Rc<dyn ParameterService>> {
        self(region, profile)
    }
}

/// Lazily creates one client per (region, profile) and keeps it for the
/// rest of the session. Not synchronized: commands run one at a time.
pub struct ClientRegistry {
    factory: Box<dyn ClientFactory>,
    clients: HashMap<(String, String), Rc<dyn ParameterService>>,
}

impl ClientRegistry {
    pub fn new(factory: Box<dyn ClientFactory>) -> Self {
        ClientRegistry {
            factory,
            clients: HashMap::new(),
        }
    }

    pub fn get_or_create(
        &mut self,
        region: &str,
        profile: &str,
    ) -> SSMResult<Rc<dyn ParameterService>> {
        let key = (region.to_string(), profile.to_string());
        if let Some(client) = self.clients.get(&key) {
            return Ok(Rc::clone(client));
        }
        debug!("No cached client for {}/{}, creating one", region, profile);
        let client = self.factory.create(region, profile)?;
        self.clients.insert(key, Rc::clone(&client));
        debug!("{} clients cached", self.len());
        Ok(client)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }
}
