// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn config_for(probe: Probe) -> CheckConfig {
    CheckConfig {
        name: pulse_core::CheckName::new("x"),
        level: pulse_core::CheckLevel::Unset,
        startup: pulse_core::CheckStartup::Enabled,
        period: Duration::from_secs(5),
        timeout: Duration::from_secs(1),
        threshold: 1,
        probe,
    }
}

#[tokio::test]
async fn tcp_probe_reports_not_implemented() {
    let factory = DefaultCheckerFactory;
    let checker = factory.build(&config_for(Probe::Tcp { host: "localhost".into(), port: 80 }));
    let err = checker.check(CancellationToken::new()).await.unwrap_err();
    assert!(err.message.contains("tcp"));
}

#[tokio::test]
async fn http_probe_reports_not_implemented() {
    let factory = DefaultCheckerFactory;
    let checker = factory.build(&config_for(Probe::Http { url: "http://localhost".into() }));
    let err = checker.check(CancellationToken::new()).await.unwrap_err();
    assert!(err.message.contains("http"));
}

#[tokio::test]
async fn exec_probe_reports_not_implemented() {
    let factory = DefaultCheckerFactory;
    let checker = factory.build(&config_for(Probe::Exec { command: "true".into() }));
    let err = checker.check(CancellationToken::new()).await.unwrap_err();
    assert!(err.message.contains("exec"));
}
