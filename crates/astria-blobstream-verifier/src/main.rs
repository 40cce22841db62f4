use std::process::ExitCode;

use astria_blobstream_verifier::{
    telemetry,
    Config,
    Verifier,
};
use tracing::{
    error,
    info,
};

// Following the BSD convention for failing to read config
// See here: https://freedesktop.org/software/systemd/man/systemd.exec.html#Process%20Exit%20Codes
const EX_CONFIG: u8 = 78;

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match Config::get() {
        Err(e) => {
            eprintln!("failed reading config:\n{e:?}");
            return ExitCode::from(EX_CONFIG);
        }
        Ok(cfg) => cfg,
    };
    if let Err(e) = telemetry::init(&cfg.log, cfg.pretty_print) {
        eprintln!(
            "failed initializing telemetry with filter directive `{log}`\n{e:?}",
            log = cfg.log,
        );
        return ExitCode::FAILURE;
    }

    info!(
        config = serde_json::to_string(&cfg).expect("serializing to a string cannot fail"),
        "initializing blobstream verifier"
    );

    let verifier = match Verifier::from_config(&cfg) {
        Err(e) => {
            error!(error = ?e, "failed initializing blobstream verifier");
            return ExitCode::from(EX_CONFIG);
        }
        Ok(verifier) => verifier,
    };

    match verifier.run().await {
        Ok(attested) => {
            info!(
                height = attested.located.height,
                share_range = %attested.located.share_range,
                batch = %attested.batch,
                "blob is attested to by Blobstream",
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error: &(dyn std::error::Error + 'static) = &e;
            error!(
                stage = e.stage().number(),
                stage_name = %e.stage(),
                kind = e.kind().name(),
                error,
                "blob could not be verified",
            );
            ExitCode::FAILURE
        }
    }
}
