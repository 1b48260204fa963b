//! The `AddressBook` registry mock

use alloy_primitives::{Bytes, B256};
use alloy_sol_types::SolInterface;

use crate::{
    sim::world::{done, mapping_slot, named_slot, ret, CallContext, Revert, SimContract},
    solidity::IAddressBook::IAddressBookCalls,
};

use super::{initialize_owner, only_owner, owner};

/// The registry: an owner-gated `string -> address` map
pub struct AddressBook;

/// The slot holding the value of `key`
fn entry_slot(key: &str) -> B256 {
    mapping_slot(named_slot("AddressBook.addresses"), key.as_bytes())
}

impl SimContract for AddressBook {
    fn execute(&self, ctx: &mut CallContext<'_>, calldata: &[u8]) -> Result<Bytes, Revert> {
        let call = IAddressBookCalls::abi_decode(calldata).map_err(|_| Revert::unknown_selector())?;

        match call {
            IAddressBookCalls::initialize(_) => {
                initialize_owner(ctx)?;
                done()
            }
            IAddressBookCalls::set(call) => {
                only_owner(ctx)?;
                ctx.store_address(entry_slot(&call.key), call.value);
                done()
            }
            IAddressBookCalls::get(call) => ret(ctx.load_address(entry_slot(&call.key))),
            IAddressBookCalls::owner(_) => ret(owner(ctx)),
        }
    }
}
