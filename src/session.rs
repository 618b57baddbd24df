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

//! Authenticated session state.
//!
//! The feed handler applies every authoritative update (fills, balance, inventory,
//! tickers, offers) to this state before listeners see the event, so a listener that
//! reads a snapshot inside its callback observes state at least as fresh as the event
//! it is handling.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use ustr::Ustr;

use crate::{
    common::enums::OrderSide,
    websocket::messages::{FillMsg, LoginOkMsg, OfferMsg, TickerMsg},
};

/// Mutable per-session bookkeeping, shared between the feed handler and the client.
pub type SharedSessionState = Arc<RwLock<SessionState>>;

/// Balance, inventory, and market state accumulated over a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Team name from the login acknowledgment.
    pub team: String,
    /// Species from the login acknowledgment.
    pub species: String,
    /// Current balance.
    pub balance: f64,
    /// Balance at session start, the baseline for [`Self::pnl_pct`].
    pub initial_balance: f64,
    /// Quantity held per product.
    pub inventory: HashMap<Ustr, i64>,
    /// Last observed mid price per product.
    pub last_mid: HashMap<Ustr, f64>,
    /// Open private offers keyed by offer ID.
    pub open_offers: HashMap<String, OfferMsg>,
}

impl SessionState {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the session from a successful login.
    pub fn apply_login(&mut self, msg: &LoginOkMsg) {
        self.team = msg.team.clone();
        self.species = msg.species.clone();
        self.balance = msg.current_balance;
        self.initial_balance = msg.current_balance;
        self.inventory.clear();
        self.last_mid.clear();
        self.open_offers.clear();
    }

    /// Applies a fill: buys add inventory and debit balance, sells do the reverse.
    pub fn apply_fill(&mut self, msg: &FillMsg) {
        let notional = msg.fill_price * msg.fill_qty as f64;
        let entry = self.inventory.entry(msg.product).or_insert(0);
        match msg.side {
            OrderSide::Buy => {
                *entry += msg.fill_qty;
                self.balance -= notional;
            }
            OrderSide::Sell => {
                *entry -= msg.fill_qty;
                self.balance += notional;
            }
        }
    }

    /// Overwrites the balance with an authoritative value from the exchange.
    pub fn apply_balance(&mut self, balance: f64) {
        self.balance = balance;
    }

    /// Overwrites one product's inventory with an authoritative value.
    pub fn apply_inventory(&mut self, product: Ustr, quantity: i64) {
        self.inventory.insert(product, quantity);
    }

    /// Records the latest mid price for a product.
    pub fn apply_ticker(&mut self, msg: &TickerMsg) {
        self.last_mid.insert(msg.product, msg.mid());
    }

    /// Records a private offer so automated tasks can respond to it later.
    pub fn apply_offer(&mut self, msg: &OfferMsg) {
        self.open_offers.insert(msg.offer_id.clone(), msg.clone());
    }

    /// Removes an offer once it has been answered.
    pub fn take_offer(&mut self, offer_id: &str) -> Option<OfferMsg> {
        self.open_offers.remove(offer_id)
    }

    /// Returns the quantity held for `product` (zero when never seen).
    #[must_use]
    pub fn position(&self, product: &Ustr) -> i64 {
        self.inventory.get(product).copied().unwrap_or(0)
    }

    /// Net worth: balance plus inventory marked at the last observed mid.
    ///
    /// Products without an observed price are valued at zero.
    #[must_use]
    pub fn net_worth(&self) -> f64 {
        let inventory_value: f64 = self
            .inventory
            .iter()
            .map(|(product, qty)| self.last_mid.get(product).copied().unwrap_or(0.0) * *qty as f64)
            .sum();
        self.balance + inventory_value
    }

    /// Profit and loss as a percentage of the initial balance.
    ///
    /// Returns zero before login (initial balance unset).
    #[must_use]
    pub fn pnl_pct(&self) -> f64 {
        if self.initial_balance == 0.0 {
            return 0.0;
        }
        (self.net_worth() - self.initial_balance) / self.initial_balance * 100.0
    }
}
