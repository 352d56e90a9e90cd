//! Upstream sources, one updater each.

pub mod brent;
pub mod currency;
pub mod dividends;
pub mod global_exchanges;
pub mod key_rates;
pub mod moex_history;
pub mod moex_live;
pub mod world_bank;

use crate::updater::Updater;

/// Index tickers tracked in `index_history`.
pub const INDEX_TICKERS: &[&str] = &["IMOEX", "RTSI"];

/// Every updater, in the order a full run executes them.
pub fn all() -> Vec<Box<dyn Updater>> {
    let mut updaters: Vec<Box<dyn Updater>> = vec![
        Box::new(moex_history::StockHistory),
        Box::new(moex_live::LiveQuoteUpdater),
        Box::new(dividends::Dividends),
    ];
    for ticker in INDEX_TICKERS {
        updaters.push(Box::new(moex_history::IndexHistory::new(ticker)));
    }
    updaters.push(Box::new(currency::CurrencyHistory));
    updaters.push(Box::new(brent::BrentHistory));
    updaters.push(Box::new(moex_history::TradingVolumes));
    updaters.push(Box::new(world_bank::WorldBank));
    updaters.push(Box::new(global_exchanges::GlobalExchanges));
    updaters.push(Box::new(key_rates::KeyRates));
    updaters
}

/// Keep the updaters named in `names`, preserving run order.
///
/// Returns the unknown names as the error.
pub fn select(names: &[String]) -> Result<Vec<Box<dyn Updater>>, Vec<String>> {
    let updaters = all();
    let unknown: Vec<String> = names
        .iter()
        .filter(|n| !updaters.iter().any(|u| u.name() == n.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }
    Ok(updaters
        .into_iter()
        .filter(|u| names.iter().any(|n| n == u.name()))
        .collect())
}
