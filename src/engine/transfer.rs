use crate::models::{articles, Entry, RowError, TransferDirection, WalletBook};

/// The opposite side of an internal transfer, booked on the wallet named in
/// the decoding. `Ok(None)` for entries that are not transfers.
pub fn mirror(entry: &Entry, wallets: &WalletBook) -> Result<Option<Entry>, RowError> {
    let Some(direction) = TransferDirection::from_article(&entry.article) else {
        return Ok(None);
    };

    let counterpart = wallets.canonical(&entry.decoding).ok_or_else(|| RowError::TransferMirrorRejected {
        direction,
        decoding: entry.decoding.clone()
    })?;

    let reversed = direction.reversed();

    Ok(Some(Entry {
        date: entry.date,
        wallet: counterpart.to_string(),
        amount: entry.amount,
        article: reversed.article().to_string(),
        decoding: entry.wallet.clone(),
        act_reference: String::new(),
        category: articles::TRANSFER_CATEGORY.to_string(),
        entry_type: reversed.entry_type().label().to_string(),
        hint: String::new(),
        foreman: String::new()
    }))
}
