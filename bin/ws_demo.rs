// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2025 Orbex Labs. All rights reserved.
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Example streaming events from an ORBEX exchange session.
//!
//! # Prerequisites
//!
//! Set environment variables:
//! - `ORBEX_TOKEN` — team token (required)
//! - `ORBEX_WS_URL` — endpoint override (defaults to the sandbox)

use std::sync::Arc;

use orbex::{
    common::{consts::ORBEX_SANDBOX_WS_URL, credential::Credential},
    config::ConnectorConfig,
    events::OrbexEventListener,
    websocket::{
        client::OrbexWebSocketClient,
        messages::{BroadcastMsg, FillMsg, TickerMsg},
    },
};

struct PrintListener;

impl OrbexEventListener for PrintListener {
    fn on_ticker(&self, msg: &TickerMsg) -> anyhow::Result<()> {
        println!("{} bid={} ask={}", msg.product, msg.best_bid, msg.best_ask);
        Ok(())
    }

    fn on_fill(&self, msg: &FillMsg) -> anyhow::Result<()> {
        println!("FILL {} {} x{} @ {}", msg.side, msg.product, msg.fill_qty, msg.fill_price);
        Ok(())
    }

    fn on_broadcast(&self, msg: &BroadcastMsg) -> anyhow::Result<()> {
        println!("BROADCAST: {}", msg.message);
        Ok(())
    }

    fn on_connection_lost(&self, cause: &str) -> anyhow::Result<()> {
        eprintln!("connection lost: {cause}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let token = std::env::var("ORBEX_TOKEN")?;
    let url =
        std::env::var("ORBEX_WS_URL").unwrap_or_else(|_| ORBEX_SANDBOX_WS_URL.to_string());

    let client = OrbexWebSocketClient::new(ConnectorConfig::default())?;
    client.register_listener(Arc::new(PrintListener));
    client.connect(&url, &Credential::new(token)).await?;

    let snapshot = client.session_snapshot();
    println!(
        "logged in as {} ({}), balance {}",
        snapshot.team, snapshot.species, snapshot.balance
    );

    tokio::signal::ctrl_c().await?;
    client.shutdown().await;
    Ok(())
}
