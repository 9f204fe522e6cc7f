//! State types

use {
    crate::{error::AccountDecodeError, MAX_USERNAME_LEN},
    borsh::{BorshDeserialize, BorshSerialize},
    solana_program::pubkey::Pubkey,
};

/// `sha256("account:LinkTreeAccount")[..8]`
pub const LINKTREE_ACCOUNT_DISCRIMINATOR: [u8; 8] = [66, 15, 11, 164, 121, 64, 218, 198];

/// Longest link title the program stores
pub const MAX_TITLE_LEN: usize = 50;

/// Longest link URL the program stores
pub const MAX_URL_LEN: usize = 200;

/// Longest avatar URI the program stores
pub const MAX_AVATAR_URI_LEN: usize = 200;

/// Longest color string the program stores
pub const MAX_COLOR_HEX_LEN: usize = 32;

/// Links a profile account has room for
pub const MAX_LINKS: usize = 10;

/// Bytes allocated for a profile account, discriminator included
pub const LINKTREE_ACCOUNT_SPACE: usize = 8
    + 32
    + (4 + MAX_USERNAME_LEN)
    + 4
    + MAX_LINKS * (8 + (4 + MAX_TITLE_LEN) + (4 + MAX_URL_LEN) + 1)
    + 8
    + (4 + MAX_AVATAR_URI_LEN)
    + (4 + MAX_COLOR_HEX_LEN);

/// One entry of a profile's link list
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Value of `link_counter` when the link was added
    pub id: u64,
    /// Display title
    pub title: String,
    /// Target URL
    pub url: String,
    /// False once the link has been deleted
    pub active: bool,
}

/// Profile account stored at the `(username, owner)` PDA
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkTreeAccount {
    /// Wallet that created and controls the profile
    pub owner: Pubkey,
    /// Profile handle, also a PDA seed
    pub username: String,
    /// Links in insertion order
    pub links: Vec<Link>,
    /// Number of links ever added; the next link's id
    pub link_counter: u64,
    /// Avatar image URI
    pub avatar_uri: String,
    /// Profile color
    pub color_hex: String,
}

impl LinkTreeAccount {
    /// Decode raw account data.
    ///
    /// Bytes after the last field are allocation padding and are ignored.
    /// Data that ends right after `link_counter` predates the settings fields;
    /// those decode as empty strings.
    pub fn try_from_account_data(data: &[u8]) -> Result<Self, AccountDecodeError> {
        if data.len() < LINKTREE_ACCOUNT_DISCRIMINATOR.len() {
            return Err(AccountDecodeError::TooShort { len: data.len() });
        }
        let (tag, mut rest) = data.split_at(LINKTREE_ACCOUNT_DISCRIMINATOR.len());
        if tag != LINKTREE_ACCOUNT_DISCRIMINATOR {
            let mut found = [0u8; 8];
            found.copy_from_slice(tag);
            return Err(AccountDecodeError::DiscriminatorMismatch { found });
        }

        let owner = Pubkey::deserialize(&mut rest)?;
        let username = String::deserialize(&mut rest)?;
        let links = Vec::<Link>::deserialize(&mut rest)?;
        let link_counter = u64::deserialize(&mut rest)?;
        let avatar_uri = optional_string(&mut rest)?;
        let color_hex = optional_string(&mut rest)?;

        Ok(Self {
            owner,
            username,
            links,
            link_counter,
            avatar_uri,
            color_hex,
        })
    }

    /// Encode as account data (discriminator + fields), without padding
    pub fn pack(&self) -> Vec<u8> {
        let mut data = LINKTREE_ACCOUNT_DISCRIMINATOR.to_vec();
        let written = borsh::to_writer(&mut data, self);
        debug_assert!(written.is_ok());
        data
    }

    /// Links that have not been deleted
    pub fn active_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.active)
    }
}

fn optional_string(rest: &mut &[u8]) -> Result<String, AccountDecodeError> {
    if rest.is_empty() {
        return Ok(String::new());
    }
    Ok(String::deserialize(rest)?)
}
