/// A cash, bank or card account entries are booked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub name: String,
    /// Background used for the wallet cell of ledger rows.
    pub color: String
}

impl Wallet {
    pub fn new(name: &str, color: &str) -> Self {
        Self { name: name.to_string(), color: color.to_string() }
    }
}

/// The closed set of wallets known to the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletBook {
    wallets: Vec<Wallet>
}

impl WalletBook {
    pub fn new(wallets: Vec<Wallet>) -> Self {
        Self { wallets }
    }

    /// Canonical spelling of `name`, matched case-insensitively after trimming.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();

        if wanted.is_empty() {
            return None;
        }

        self.wallets.iter()
            .find(|wallet| wallet.name.trim().to_lowercase() == wanted)
            .map(|wallet| wallet.name.as_str())
    }

    /// Display color for the exact wallet name as written on an entry.
    pub fn color(&self, name: &str) -> Option<&str> {
        self.wallets.iter()
            .find(|wallet| wallet.name == name)
            .map(|wallet| wallet.color.as_str())
    }
}

impl Default for WalletBook {
    fn default() -> Self {
        Self::new(vec![
            Wallet::new("Р/С Строймат", "#2496dd"),
            Wallet::new("Р/С Брендмар", "#EABB3D"),
            Wallet::new("Наличные", "#0dac50"),
            Wallet::new("Карта", "#17ddee"),
            Wallet::new("Карта Артема", "#E6E0EC"),
            Wallet::new("Карта Паши", "#E6E0EC"),
            Wallet::new("ИП Паши", "#D9D9D9")
        ])
    }
}
