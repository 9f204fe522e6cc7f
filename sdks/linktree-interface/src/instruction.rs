//! Instruction types

use {
    borsh::{BorshDeserialize, BorshSerialize},
    solana_program::{
        instruction::{AccountMeta, Instruction},
        program_error::ProgramError,
        pubkey::Pubkey,
        system_program,
    },
};

/// Length of the instruction discriminator prefix.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Arguments of `create_linktree_account`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateLinktreeAccountArgs {
    /// Handle of the new profile
    pub username: String,
}

/// Arguments of `add_links`.
///
/// `urls` and `titles` are parallel; the program rejects them when their
/// lengths differ.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddLinksArgs {
    /// Handle of the profile
    pub username: String,
    /// Link targets
    pub urls: Vec<String>,
    /// Link titles
    pub titles: Vec<String>,
}

/// Arguments of `delete_links`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeleteLinksArgs {
    /// Handle of the profile
    pub username: String,
    /// Ids of the links to deactivate
    pub link_ids: Vec<u64>,
}

/// Arguments of `edit_avatar_uri`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EditAvatarUriArgs {
    /// Handle of the profile
    pub username: String,
    /// New avatar image URI
    pub avatar_uri: String,
}

/// Arguments of `edit_color_hex`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EditColorHexArgs {
    /// Handle of the profile
    pub username: String,
    /// New color, either a palette name or `#rrggbb`
    pub color_hex: String,
}

/// Arguments of `delete_linktree_account`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeleteLinktreeAccountArgs {
    /// Handle of the profile
    pub username: String,
}

/// Instructions supported by the linktree program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinktreeInstruction {
    /// Create a profile at the `(username, owner)` PDA
    CreateLinktreeAccount(CreateLinktreeAccountArgs),
    /// Append links; each one takes the next `link_counter` value as its id
    AddLinks(AddLinksArgs),
    /// Mark links inactive
    DeleteLinks(DeleteLinksArgs),
    /// Replace the avatar URI
    EditAvatarUri(EditAvatarUriArgs),
    /// Replace the profile color
    EditColorHex(EditColorHexArgs),
    /// Close the profile account
    DeleteLinktreeAccount(DeleteLinktreeAccountArgs),
}

impl LinktreeInstruction {
    /// `sha256("global:create_linktree_account")[..8]`
    pub const CREATE_LINKTREE_ACCOUNT: [u8; 8] = [104, 38, 42, 26, 176, 17, 90, 218];
    /// `sha256("global:add_links")[..8]`
    pub const ADD_LINKS: [u8; 8] = [116, 86, 100, 46, 223, 210, 178, 75];
    /// `sha256("global:delete_links")[..8]`
    pub const DELETE_LINKS: [u8; 8] = [234, 215, 247, 80, 170, 240, 251, 116];
    /// `sha256("global:edit_avatar_uri")[..8]`
    pub const EDIT_AVATAR_URI: [u8; 8] = [124, 192, 124, 194, 10, 230, 97, 1];
    /// `sha256("global:edit_color_hex")[..8]`
    pub const EDIT_COLOR_HEX: [u8; 8] = [110, 17, 62, 124, 31, 225, 137, 210];
    /// `sha256("global:delete_linktree_account")[..8]`
    pub const DELETE_LINKTREE_ACCOUNT: [u8; 8] = [157, 7, 7, 42, 119, 243, 97, 231];

    /// Discriminator prefix of this instruction
    pub fn discriminator(&self) -> [u8; 8] {
        match self {
            Self::CreateLinktreeAccount(_) => Self::CREATE_LINKTREE_ACCOUNT,
            Self::AddLinks(_) => Self::ADD_LINKS,
            Self::DeleteLinks(_) => Self::DELETE_LINKS,
            Self::EditAvatarUri(_) => Self::EDIT_AVATAR_URI,
            Self::EditColorHex(_) => Self::EDIT_COLOR_HEX,
            Self::DeleteLinktreeAccount(_) => Self::DELETE_LINKTREE_ACCOUNT,
        }
    }

    /// Username every instruction carries as its first argument
    pub fn username(&self) -> &str {
        match self {
            Self::CreateLinktreeAccount(args) => &args.username,
            Self::AddLinks(args) => &args.username,
            Self::DeleteLinks(args) => &args.username,
            Self::EditAvatarUri(args) => &args.username,
            Self::EditColorHex(args) => &args.username,
            Self::DeleteLinktreeAccount(args) => &args.username,
        }
    }

    /// Unpack a byte array into a LinktreeInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() < DISCRIMINATOR_LEN {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (tag, rest) = input.split_at(DISCRIMINATOR_LEN);
        let tag: [u8; 8] = tag
            .try_into()
            .map_err(|_| ProgramError::InvalidInstructionData)?;

        fn args<T: BorshDeserialize>(rest: &[u8]) -> Result<T, ProgramError> {
            borsh::from_slice(rest).map_err(|_| ProgramError::InvalidInstructionData)
        }

        Ok(match tag {
            Self::CREATE_LINKTREE_ACCOUNT => Self::CreateLinktreeAccount(args(rest)?),
            Self::ADD_LINKS => Self::AddLinks(args(rest)?),
            Self::DELETE_LINKS => Self::DeleteLinks(args(rest)?),
            Self::EDIT_AVATAR_URI => Self::EditAvatarUri(args(rest)?),
            Self::EDIT_COLOR_HEX => Self::EditColorHex(args(rest)?),
            Self::DELETE_LINKTREE_ACCOUNT => Self::DeleteLinktreeAccount(args(rest)?),
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Pack the LinktreeInstruction into a byte array
    pub fn pack(&self) -> Vec<u8> {
        let mut data = self.discriminator().to_vec();
        let written = match self {
            Self::CreateLinktreeAccount(args) => borsh::to_writer(&mut data, args),
            Self::AddLinks(args) => borsh::to_writer(&mut data, args),
            Self::DeleteLinks(args) => borsh::to_writer(&mut data, args),
            Self::EditAvatarUri(args) => borsh::to_writer(&mut data, args),
            Self::EditColorHex(args) => borsh::to_writer(&mut data, args),
            Self::DeleteLinktreeAccount(args) => borsh::to_writer(&mut data, args),
        };
        // Writing into a Vec only fails on allocation failure, which aborts anyway.
        debug_assert!(written.is_ok());
        data
    }

    /// Build the full instruction against `program_id`.
    ///
    /// Accounts (strict order, identical for every instruction):
    /// - linktree_account (writable)
    /// - owner (writable, signer)
    /// - system_program (readonly)
    pub fn into_instruction(
        self,
        program_id: Pubkey,
        linktree_account: Pubkey,
        owner: Pubkey,
    ) -> Instruction {
        Instruction {
            program_id,
            accounts: vec![
                AccountMeta::new(linktree_account, false),
                AccountMeta::new(owner, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: self.pack(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    fn anchor_discriminator(name: &str) -> [u8; 8] {
        let digest = Sha256::digest(format!("global:{name}").as_bytes());
        let mut out = [0u8; 8];
        out.copy_from_slice(&digest[..8]);
        out
    }

    #[test]
    fn discriminators_follow_anchor_sighash() {
        assert_eq!(
            LinktreeInstruction::CREATE_LINKTREE_ACCOUNT,
            anchor_discriminator("create_linktree_account")
        );
        assert_eq!(LinktreeInstruction::ADD_LINKS, anchor_discriminator("add_links"));
        assert_eq!(
            LinktreeInstruction::DELETE_LINKS,
            anchor_discriminator("delete_links")
        );
        assert_eq!(
            LinktreeInstruction::EDIT_AVATAR_URI,
            anchor_discriminator("edit_avatar_uri")
        );
        assert_eq!(
            LinktreeInstruction::EDIT_COLOR_HEX,
            anchor_discriminator("edit_color_hex")
        );
        assert_eq!(
            LinktreeInstruction::DELETE_LINKTREE_ACCOUNT,
            anchor_discriminator("delete_linktree_account")
        );
    }

    #[test]
    fn create_encoding_is_discriminator_then_borsh_string() {
        let ix = LinktreeInstruction::CreateLinktreeAccount(CreateLinktreeAccountArgs {
            username: "alice".into(),
        });
        let data = ix.pack();
        assert_eq!(&data[..8], &LinktreeInstruction::CREATE_LINKTREE_ACCOUNT);
        assert_eq!(&data[8..12], &5u32.to_le_bytes());
        assert_eq!(&data[12..], b"alice");
        assert_eq!(LinktreeInstruction::unpack(&data).unwrap(), ix);
    }

    #[test]
    fn add_links_keeps_mismatched_lengths() {
        let ix = LinktreeInstruction::AddLinks(AddLinksArgs {
            username: "alice".into(),
            urls: vec!["https://a.example".into(), "https://b.example".into()],
            titles: vec!["Blog".into()],
        });
        let LinktreeInstruction::AddLinks(args) =
            LinktreeInstruction::unpack(&ix.pack()).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.titles.len(), 1);
    }

    #[test]
    fn unpack_rejects_unknown_and_short_input() {
        assert_eq!(
            LinktreeInstruction::unpack(&[1, 2, 3]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LinktreeInstruction::unpack(&[0u8; 16]),
            Err(ProgramError::InvalidInstructionData)
        );
        // valid tag, truncated args
        let mut data = LinktreeInstruction::ADD_LINKS.to_vec();
        data.extend_from_slice(&10u32.to_le_bytes());
        assert_eq!(
            LinktreeInstruction::unpack(&data),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn account_metas_order() {
        let program_id = crate::id();
        let pda = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ix = LinktreeInstruction::DeleteLinktreeAccount(DeleteLinktreeAccountArgs {
            username: "alice".into(),
        })
        .into_instruction(program_id, pda, owner);

        assert_eq!(ix.program_id, program_id);
        assert_eq!(ix.accounts.len(), 3);
        assert_eq!(ix.accounts[0], AccountMeta::new(pda, false));
        assert_eq!(ix.accounts[1], AccountMeta::new(owner, true));
        assert_eq!(
            ix.accounts[2],
            AccountMeta::new_readonly(system_program::id(), false)
        );
    }
}
