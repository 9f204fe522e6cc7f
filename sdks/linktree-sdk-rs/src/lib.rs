//! Linktree – Rust SDK (client-side helpers)
//!
//! This crate provides:
//! - PDA helpers and instruction builders with client-side validation ([`LinktreeClient`])
//! - An account reader that enumerates and decodes profiles ([`reader`])
//! - Transaction preparation bound to a fresh blockhash ([`builder`])
//! - Signing, submission and confirmation with classified failures ([`submit`])
//! - A generation-checked query cache and a session facade ([`cache`], [`session`])
//!
//! Every network call goes through the [`rpc::LinktreeRpc`] trait and every
//! signature through [`signer::WalletSigner`].

pub mod builder;
pub mod cache;
pub mod error;
pub mod reader;
pub mod rpc;
pub mod session;
pub mod signer;
pub mod submit;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use linktree_interface as program;
use program::instruction::{
    AddLinksArgs, CreateLinktreeAccountArgs, DeleteLinksArgs, DeleteLinktreeAccountArgs,
    EditAvatarUriArgs, EditColorHexArgs, LinktreeInstruction,
};
use program::state::{MAX_AVATAR_URI_LEN, MAX_COLOR_HEX_LEN, MAX_TITLE_LEN, MAX_URL_LEN};
use program::MAX_USERNAME_LEN;

pub use builder::{Anchor, Operation, PreparedTransaction, TransactionBuilder};
pub use cache::{CachedValue, QueryCache, QueryKey};
pub use error::{LinktreeError, ProgramFailure, Result};
pub use reader::LinktreeReader;
pub use rpc::{LinktreeRpc, SignatureRecord};
pub use session::{LinktreeSession, MutationOutcome, SessionConfig};
pub use signer::WalletSigner;
pub use submit::{SubmitConfig, Submitter};

/// Thin client for deriving profile addresses and building instructions for
/// the linktree program.
///
/// The `program_id` must be the deployed linktree program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinktreeClient {
    pub program_id: Pubkey,
}

impl Default for LinktreeClient {
    fn default() -> Self {
        Self::new(program::id())
    }
}

impl LinktreeClient {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    /// Derive the profile PDA for `(username, owner)`.
    ///
    /// Fails with [`LinktreeError::InvalidInput`] when the username is empty
    /// or cannot be a seed.
    pub fn profile_pda(&self, username: &str, owner: &Pubkey) -> Result<Pubkey> {
        self.profile_pda_and_bump(username, owner).map(|(pda, _)| pda)
    }

    /// Derive the profile PDA for `(username, owner)`, with the bump.
    pub fn profile_pda_and_bump(&self, username: &str, owner: &Pubkey) -> Result<(Pubkey, u8)> {
        validate_username(username)?;
        program::try_find_linktree_pda_with_program(&self.program_id, username, owner).ok_or_else(
            || LinktreeError::InvalidInput(format!("no program address for username {username:?}")),
        )
    }

    /// Build a create_linktree_account instruction.
    ///
    /// Accounts (strict order, shared by every builder below):
    /// - linktree_account (writable)
    /// - owner (writable, signer)
    /// - system_program (readonly)
    pub fn create_linktree_account_ix(&self, params: CreateProfileParams) -> Result<Instruction> {
        let pda = self.profile_pda(&params.username, &params.owner)?;
        Ok(
            LinktreeInstruction::CreateLinktreeAccount(CreateLinktreeAccountArgs {
                username: params.username,
            })
            .into_instruction(self.program_id, pda, params.owner),
        )
    }

    /// Build an add_links instruction.
    ///
    /// `urls` and `titles` of different lengths are passed through; the
    /// program rejects them with `LengthInputsNotSame`.
    pub fn add_links_ix(&self, params: AddLinksParams) -> Result<Instruction> {
        let pda = self.profile_pda(&params.username, &params.owner)?;
        self.validate_links(&params.urls, &params.titles)?;
        Ok(LinktreeInstruction::AddLinks(AddLinksArgs {
            username: params.username,
            urls: params.urls,
            titles: params.titles,
        })
        .into_instruction(self.program_id, pda, params.owner))
    }

    /// Build a delete_links instruction.
    pub fn delete_links_ix(&self, params: DeleteLinksParams) -> Result<Instruction> {
        let pda = self.profile_pda(&params.username, &params.owner)?;
        if params.link_ids.is_empty() {
            return Err(LinktreeError::InvalidInput("no link ids given".into()));
        }
        Ok(LinktreeInstruction::DeleteLinks(DeleteLinksArgs {
            username: params.username,
            link_ids: params.link_ids,
        })
        .into_instruction(self.program_id, pda, params.owner))
    }

    /// Build an edit_avatar_uri instruction.
    pub fn edit_avatar_uri_ix(
        &self,
        owner: Pubkey,
        username: &str,
        avatar_uri: String,
    ) -> Result<Instruction> {
        let pda = self.profile_pda(username, &owner)?;
        validate_len("avatar uri", &avatar_uri, MAX_AVATAR_URI_LEN)?;
        Ok(LinktreeInstruction::EditAvatarUri(EditAvatarUriArgs {
            username: username.to_string(),
            avatar_uri,
        })
        .into_instruction(self.program_id, pda, owner))
    }

    /// Build an edit_color_hex instruction.
    pub fn edit_color_hex_ix(
        &self,
        owner: Pubkey,
        username: &str,
        color_hex: String,
    ) -> Result<Instruction> {
        let pda = self.profile_pda(username, &owner)?;
        validate_len("color", &color_hex, MAX_COLOR_HEX_LEN)?;
        Ok(LinktreeInstruction::EditColorHex(EditColorHexArgs {
            username: username.to_string(),
            color_hex,
        })
        .into_instruction(self.program_id, pda, owner))
    }

    /// Build a delete_linktree_account instruction.
    pub fn delete_linktree_account_ix(&self, params: DeleteProfileParams) -> Result<Instruction> {
        let pda = self.profile_pda(&params.username, &params.owner)?;
        Ok(
            LinktreeInstruction::DeleteLinktreeAccount(DeleteLinktreeAccountArgs {
                username: params.username,
            })
            .into_instruction(self.program_id, pda, params.owner),
        )
    }

    /// Build the settings bundle: one instruction per field that changes.
    ///
    /// Returns: [] (nothing changes), [edit_avatar_uri], [edit_color_hex] or
    /// [edit_avatar_uri, edit_color_hex].
    pub fn edit_settings_ixs(&self, params: EditSettingsParams) -> Result<Vec<Instruction>> {
        // Derive even for an empty bundle so a bad username is still reported.
        self.profile_pda(&params.username, &params.owner)?;

        let mut ixs = Vec::with_capacity(2);
        if let SettingChange::Set(avatar_uri) = params.avatar_uri {
            ixs.push(self.edit_avatar_uri_ix(params.owner, &params.username, avatar_uri)?);
        }
        if let SettingChange::Set(color_hex) = params.color_hex {
            ixs.push(self.edit_color_hex_ix(params.owner, &params.username, color_hex)?);
        }
        Ok(ixs)
    }
}

// === Params ===
/// Parameters for create_linktree_account.
#[derive(Debug, Clone)]
pub struct CreateProfileParams {
    /// Wallet that signs, pays, and owns the profile
    pub owner: Pubkey,
    /// Handle of the new profile (1..=32 bytes)
    pub username: String,
}

/// Parameters for add_links.
#[derive(Debug, Clone)]
pub struct AddLinksParams {
    /// Profile owner (must sign)
    pub owner: Pubkey,
    /// Profile handle
    pub username: String,
    /// Link targets (each <= MAX_URL_LEN)
    pub urls: Vec<String>,
    /// Link titles (each <= MAX_TITLE_LEN), parallel to `urls`
    pub titles: Vec<String>,
}

/// Parameters for delete_links.
#[derive(Debug, Clone)]
pub struct DeleteLinksParams {
    /// Profile owner (must sign)
    pub owner: Pubkey,
    /// Profile handle
    pub username: String,
    /// Ids of the links to deactivate
    pub link_ids: Vec<u64>,
}

/// Parameters for delete_linktree_account.
#[derive(Debug, Clone)]
pub struct DeleteProfileParams {
    /// Profile owner (must sign)
    pub owner: Pubkey,
    /// Profile handle
    pub username: String,
}

/// Whether a settings field is rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SettingChange {
    /// Leave the stored value alone
    #[default]
    Unchanged,
    /// Replace the stored value
    Set(String),
}

impl SettingChange {
    /// `Set(new)` when `new` differs from `current`, `Unchanged` otherwise
    pub fn diff(current: &str, new: Option<String>) -> Self {
        match new {
            Some(new) if new != current => SettingChange::Set(new),
            _ => SettingChange::Unchanged,
        }
    }
}

impl From<Option<String>> for SettingChange {
    fn from(value: Option<String>) -> Self {
        value.map_or(SettingChange::Unchanged, SettingChange::Set)
    }
}

/// Parameters for the edit-settings bundle.
#[derive(Debug, Clone)]
pub struct EditSettingsParams {
    /// Profile owner (must sign)
    pub owner: Pubkey,
    /// Profile handle
    pub username: String,
    /// New avatar URI, if it changes
    pub avatar_uri: SettingChange,
    /// New color, if it changes
    pub color_hex: SettingChange,
}

/// List-mode row: enough to render a directory and link to a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    /// Profile handle
    pub username: String,
    /// Profile account address
    pub address: Pubkey,
    /// Owning wallet
    pub owner: Pubkey,
}

// === Validation helpers ===
fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(LinktreeError::InvalidInput("username is empty".into()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(LinktreeError::InvalidInput(format!(
            "username is {} bytes, at most {MAX_USERNAME_LEN} allowed",
            username.len()
        )));
    }
    Ok(())
}

fn validate_len(what: &str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(LinktreeError::InvalidInput(format!(
            "{what} too long ({} bytes, at most {max})",
            value.len()
        )));
    }
    Ok(())
}

impl LinktreeClient {
    fn validate_links(&self, urls: &[String], titles: &[String]) -> Result<()> {
        if urls.is_empty() && titles.is_empty() {
            return Err(LinktreeError::InvalidInput("no links given".into()));
        }
        for url in urls {
            validate_len("url", url, MAX_URL_LEN)?;
        }
        for title in titles {
            validate_len("title", title, MAX_TITLE_LEN)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{instruction::AccountMeta, system_program};

    fn client() -> LinktreeClient {
        LinktreeClient::default()
    }

    #[test]
    fn pda_matches_interface_derivation() {
        let owner = Pubkey::new_unique();
        let (expected, bump) =
            program::try_find_linktree_pda_with_program(&program::id(), "alice", &owner).unwrap();
        assert_eq!(client().profile_pda("alice", &owner).unwrap(), expected);
        assert_eq!(
            client().profile_pda_and_bump("alice", &owner).unwrap(),
            (expected, bump)
        );
    }

    #[test]
    fn username_validation() {
        let owner = Pubkey::new_unique();
        assert!(matches!(
            client().profile_pda("", &owner),
            Err(LinktreeError::InvalidInput(_))
        ));
        assert!(matches!(
            client().profile_pda(&"a".repeat(33), &owner),
            Err(LinktreeError::InvalidInput(_))
        ));
        assert!(client().profile_pda(&"a".repeat(32), &owner).is_ok());
    }

    #[test]
    fn create_ix_accounts_and_data() {
        let owner = Pubkey::new_unique();
        let ix = client()
            .create_linktree_account_ix(CreateProfileParams {
                owner,
                username: "alice".into(),
            })
            .unwrap();
        let pda = client().profile_pda("alice", &owner).unwrap();

        assert_eq!(ix.program_id, program::id());
        assert_eq!(
            ix.accounts,
            vec![
                AccountMeta::new(pda, false),
                AccountMeta::new(owner, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ]
        );
        assert_eq!(&ix.data[..8], &LinktreeInstruction::CREATE_LINKTREE_ACCOUNT);
    }

    #[test]
    fn add_links_validation() {
        let owner = Pubkey::new_unique();
        let params = |urls: Vec<&str>, titles: Vec<&str>| AddLinksParams {
            owner,
            username: "alice".into(),
            urls: urls.into_iter().map(String::from).collect(),
            titles: titles.into_iter().map(String::from).collect(),
        };

        assert!(matches!(
            client().add_links_ix(params(vec![], vec![])),
            Err(LinktreeError::InvalidInput(_))
        ));

        // mismatched lengths are left for the program to reject
        let ix = client()
            .add_links_ix(params(vec!["https://a.example", "https://b.example"], vec!["A"]))
            .unwrap();
        assert_eq!(&ix.data[..8], &LinktreeInstruction::ADD_LINKS);

        let long_title = "t".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(
            client().add_links_ix(params(vec!["https://a.example"], vec![&long_title])),
            Err(LinktreeError::InvalidInput(_))
        ));

        let long_url = "u".repeat(MAX_URL_LEN + 1);
        assert!(matches!(
            client().add_links_ix(params(vec![&long_url], vec!["A"])),
            Err(LinktreeError::InvalidInput(_))
        ));
    }

    #[test]
    fn edit_settings_bundle_sizes() {
        let owner = Pubkey::new_unique();
        let params = |avatar_uri, color_hex| EditSettingsParams {
            owner,
            username: "alice".into(),
            avatar_uri,
            color_hex,
        };

        let none = client()
            .edit_settings_ixs(params(SettingChange::Unchanged, SettingChange::Unchanged))
            .unwrap();
        assert!(none.is_empty());

        let color = client()
            .edit_settings_ixs(params(
                SettingChange::Unchanged,
                SettingChange::Set("violet".into()),
            ))
            .unwrap();
        assert_eq!(color.len(), 1);
        assert_eq!(&color[0].data[..8], &LinktreeInstruction::EDIT_COLOR_HEX);

        let both = client()
            .edit_settings_ixs(params(
                SettingChange::Set("https://a.example/me.png".into()),
                SettingChange::Set("#112233".into()),
            ))
            .unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(&both[0].data[..8], &LinktreeInstruction::EDIT_AVATAR_URI);
        assert_eq!(&both[1].data[..8], &LinktreeInstruction::EDIT_COLOR_HEX);
    }

    #[test]
    fn oversized_settings_are_rejected() {
        let owner = Pubkey::new_unique();
        assert!(matches!(
            client().edit_color_hex_ix(owner, "alice", "c".repeat(MAX_COLOR_HEX_LEN + 1)),
            Err(LinktreeError::InvalidInput(_))
        ));
        assert!(matches!(
            client().edit_avatar_uri_ix(owner, "alice", "a".repeat(MAX_AVATAR_URI_LEN + 1)),
            Err(LinktreeError::InvalidInput(_))
        ));
    }

    #[test]
    fn setting_change_diff() {
        assert_eq!(SettingChange::diff("red", None), SettingChange::Unchanged);
        assert_eq!(
            SettingChange::diff("red", Some("red".into())),
            SettingChange::Unchanged
        );
        assert_eq!(
            SettingChange::diff("red", Some("blue".into())),
            SettingChange::Set("blue".into())
        );
    }

    #[test]
    fn delete_links_requires_ids() {
        let err = client()
            .delete_links_ix(DeleteLinksParams {
                owner: Pubkey::new_unique(),
                username: "alice".into(),
                link_ids: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, LinktreeError::InvalidInput(_)));
    }
}
