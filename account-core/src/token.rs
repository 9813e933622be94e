//! Token issuer accounts

use crate::{
    account::{positive, Accounter, AccountState, RoleState},
    Account, Address, Error, Result, TokenSymbol,
};
use num_bigint::BigUint;
use num_traits::Zero;

impl AccountState {
    fn prepare_create_token(&self, accounter: &Accounter, max_total_supply: &BigUint) -> Result<()> {
        let token = TokenSymbol::from_address(&self.id);
        if !token.is_valid() {
            return Err(Error::InvalidInput(format!("invalid token account {}", self.id)));
        }
        if !self.is_empty() {
            return Err(Error::InvalidRoleState(format!("token account {} exists", token)));
        }
        if !token.is_native() {
            accounter.validate(true)?;
        }
        positive(max_total_supply, "max total supply")
    }

    fn prepare_destroy_token(&self, recipient: &Address) -> Result<TokenSymbol> {
        let max_total_supply = match &self.role {
            RoleState::Token { max_total_supply } => max_total_supply,
            _ => {
                return Err(Error::InvalidRoleState(format!(
                    "{} is not a token account",
                    self.id
                )))
            }
        };
        let token = TokenSymbol::from_address(&self.id);
        if token.is_native() {
            return Err(Error::InvalidRoleState(format!("can't destroy {}", token)));
        }
        if *recipient == self.id {
            return Err(Error::InvalidInput(format!("can't destroy {} to itself", token)));
        }
        if self.lending.is_some() {
            return Err(Error::InvalidRoleState(format!(
                "lending pool of {} should be closed",
                self.id
            )));
        }
        let held = self.balance_of_all(&token);
        if held != *max_total_supply {
            return Err(Error::SupplyStillInUse {
                token,
                expected: max_total_supply.clone(),
                actual: held,
            });
        }
        Ok(token)
    }
}

impl Account {
    /// Check token account creation
    pub fn check_create_token(&self, accounter: &Accounter, max_total_supply: &BigUint) -> Result<()> {
        self.read().prepare_create_token(accounter, max_total_supply)
    }

    /// Turn this empty account into the issuer of its token and mint the
    /// whole supply to it. The native token account is minted its balance
    /// directly and carries no governance.
    pub fn create_token(
        &self,
        pledge: BigUint,
        accounter: &Accounter,
        max_total_supply: &BigUint,
    ) -> Result<()> {
        let mut state = self.write();
        state.prepare_create_token(accounter, max_total_supply)?;
        let token = TokenSymbol::from_address(&self.id());
        state.role = RoleState::Token {
            max_total_supply: max_total_supply.clone(),
        };
        if token.is_native() {
            state.balance = max_total_supply.clone();
        } else {
            state.set_governance(accounter);
            state.pledge = pledge;
            state.tokens.insert(token, max_total_supply.clone());
        }
        tracing::info!(
            account = %self.id(),
            token = %token,
            supply = %max_total_supply,
            "Token created"
        );
        Ok(())
    }

    /// Check token account destruction
    pub fn check_destroy_token(&self, recipient: &Address) -> Result<()> {
        self.read().prepare_destroy_token(recipient).map(|_| ())
    }

    /// Burn the full supply, demote to a plain account and move the native
    /// balance, pledge included, to `recipient`
    pub fn destroy_token(&self, recipient: &Account) -> Result<()> {
        let (token, native) = {
            let mut state = self.write();
            let token = state.prepare_destroy_token(&recipient.id())?;
            state.tokens.remove(&token);
            let native = std::mem::replace(&mut state.balance, BigUint::zero());
            state.reset_to_plain();
            (token, native)
        };

        recipient.add(&TokenSymbol::NATIVE, &native);
        tracing::info!(
            account = %self.id(),
            token = %token,
            recipient = %recipient.id(),
            native = %native,
            "Token destroyed"
        );
        Ok(())
    }
}
