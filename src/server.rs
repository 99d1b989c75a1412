use std::sync::Arc;

use http_status_counter::Measurement;
use pingora::prelude::*;
use pingora::server::RunArgs;
use pingora::server::Server as PingoraServer;
use pingora::server::configuration::Opt;
use pingora::services::background::GenBackgroundService;

use crate::configuration::ProxyConfig;
use crate::proxy::StatusProxy;
use crate::reporter::StatusReporter;

pub struct Server {
    server: PingoraServer,
}

impl Server {
    pub fn new(opt: Option<Opt>) -> Result<Self> {
        let server = PingoraServer::new(opt)?;
        Ok(Server { server })
    }

    pub fn bootstrap(&mut self, config: ProxyConfig, measurement: Arc<Measurement>) -> Result<()> {
        self.server.bootstrap();

        config.validate().map_err(|e| {
            Error::explain(ErrorType::InternalError, format!("invalid proxy config: {e}"))
        })?;

        if let Some(report) = &config.report {
            log::info!("Reporting status counts every {:?}", report.interval());
            let reporter = StatusReporter::new(measurement.clone(), report.interval());
            let background =
                GenBackgroundService::new("status reporter".to_string(), Arc::new(reporter));
            self.server.add_service(background);
        }

        let mut proxy_service = http_proxy_service(
            &self.server.configuration,
            StatusProxy::new(&config, measurement),
        );
        proxy_service.add_tcp(&config.listen);
        self.server.add_service(proxy_service);

        log::info!(
            "Forwarding {} to {}",
            config.listen,
            config.upstream.address()
        );
        Ok(())
    }

    pub fn run_forever(self) {
        self.server.run_forever();
    }

    pub fn run(self, args: RunArgs) {
        self.server.run(args);
    }
}
