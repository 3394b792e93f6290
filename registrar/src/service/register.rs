use super::Service;
use crate::{
    store::{BaseDomain, NameRecord, Store},
    validation::{
        address_message, base_domain_message, base_name, check_name, check_signature,
        decode_cid_v0, parse_address, storage_message, subdomain_message, text_message,
    },
    ChainReader, Error, OwnerReader,
};
use alloy_primitives::{Address, U256};
use ensgate_cryptography::message::recover_message_hex;
use tracing::{debug, info};

/// Bind a base domain to a token contract.
#[derive(Clone, Debug)]
pub struct BaseDomainRequest {
    /// Chain the token contract lives on
    pub chain_id: u64,
    /// Token contract, as signed
    pub token_contract: String,
    pub name: String,
    pub signature: String,
    /// ENS deployment the base domain lives on
    pub ens_chain_id: Option<u64>,
}

/// Register the subdomain of one token.
#[derive(Clone, Debug)]
pub struct SubdomainRequest {
    pub chain_id: u64,
    pub name: String,
    /// Token id, as signed
    pub token_id: String,
    pub signature: String,
    /// Address to resolve to instead of the token-bound account
    pub ens_address: Option<String>,
    pub ens_chain_id: Option<u64>,
}

/// Set a text record.
#[derive(Clone, Debug)]
pub struct TextRequest {
    pub chain_id: u64,
    pub name: String,
    pub key: String,
    pub value: String,
    pub signature: String,
}

/// Set the content hash to an IPFS CIDv0.
#[derive(Clone, Debug)]
pub struct ContentRequest {
    pub chain_id: u64,
    pub name: String,
    pub ipfs_hash: String,
    pub signature: String,
}

/// Override the address answered for one coin type.
#[derive(Clone, Debug)]
pub struct AddressRequest {
    pub chain_id: u64,
    pub name: String,
    pub coin_type: u64,
    /// Address, as signed
    pub address: String,
    pub signature: String,
}

fn parse_token_id(raw: &str) -> Result<U256, Error> {
    raw.parse()
        .map_err(|_| Error::MalformedTokenId(raw.to_string()))
}

impl<S: Store, C: OwnerReader + ChainReader> Service<S, C> {
    /// Register `name` as the base domain of a token contract.
    ///
    /// Succeeds only if the name's resolver delegates to this gateway and the signer owns the
    /// name, either as registered here or in the ENS registry.
    pub async fn register_base_domain(&self, req: BaseDomainRequest) -> Result<(), Error> {
        check_name(&req.name, self.cfg.name_limit)?;
        check_signature(&req.signature)?;
        let token_contract = parse_address(&req.token_contract)?;
        if self.store.base_domain(&req.name).is_some() {
            return Err(Error::BaseNameRegistered(req.name));
        }
        if self
            .store
            .base_domain_for_contract(req.chain_id, token_contract)
            .is_some()
        {
            return Err(Error::TokenContractRegistered {
                chain_id: req.chain_id,
                contract: token_contract,
            });
        }

        let ens_chain_id = req.ens_chain_id.unwrap_or(self.cfg.default_ens_chain_id);
        self.check_resolver(&req.name, ens_chain_id, req.chain_id)
            .await?;

        let message = base_domain_message(&req.name, &req.token_contract, req.chain_id);
        let signer = recover_message_hex(message.as_bytes(), &req.signature)?;
        let owner = match self.store.name(&req.name) {
            Some(record) => record.owner,
            None => self.chain.domain_owner(ens_chain_id, &req.name).await?,
        };
        if owner != signer {
            debug!(name = %req.name, ?owner, ?signer, "signer does not own domain");
            return Err(Error::NotOwner);
        }

        self.store.insert_base_domain(BaseDomain {
            name: req.name.clone(),
            token_contract,
            chain_id: req.chain_id,
            owner: signer,
        })?;
        info!(name = %req.name, ?token_contract, chain_id = req.chain_id, "registered base domain");
        Ok(())
    }

    /// Register `name` for the token the signer holds.
    ///
    /// The name resolves to the token-bound account of the token unless a valid `ens_address`
    /// is given.
    pub async fn register_subdomain(&self, req: SubdomainRequest) -> Result<(), Error> {
        check_name(&req.name, self.cfg.name_limit)?;
        check_signature(&req.signature)?;
        if self.store.name(&req.name).is_some() {
            return Err(Error::NameUnavailable);
        }
        let base = base_name(&req.name)?;
        let Some(domain) = self
            .store
            .base_domain(base)
            .filter(|domain| domain.chain_id == req.chain_id)
        else {
            return Err(Error::BaseNameNotRegistered(base.to_string()));
        };
        let token_id = parse_token_id(&req.token_id)?;

        let message = subdomain_message(&req.name, &req.token_id, req.chain_id);
        let signer = recover_message_hex(message.as_bytes(), &req.signature)?;
        let owns = self
            .ownership
            .owns_token(req.chain_id, domain.token_contract, signer, token_id)
            .await?;
        if !owns {
            return Err(Error::NotOwner);
        }

        let address = match req.ens_address.as_deref().map(parse_address) {
            Some(Ok(address)) => address,
            Some(Err(err)) => {
                debug!(?err, "ignoring invalid ens address");
                self.token_account(&domain, token_id)
            }
            None => self.token_account(&domain, token_id),
        };
        self.store.insert_name(NameRecord {
            name: req.name.clone(),
            address,
            chain_id: req.chain_id,
            token_id,
            owner: signer,
            ens_chain_id: req.ens_chain_id,
        })?;
        info!(name = %req.name, %token_id, ?address, "registered name");
        Ok(())
    }

    /// Set a text record of a registered name.
    pub async fn register_text(&self, req: TextRequest) -> Result<(), Error> {
        check_signature(&req.signature)?;
        let message = text_message(&req.name, &req.key, &req.value, req.chain_id);
        self.authorize(req.chain_id, &req.name, &message, &req.signature)
            .await?;
        self.store.set_text(&req.name, &req.key, &req.value);
        info!(name = %req.name, key = %req.key, "updated text record");
        Ok(())
    }

    /// Set the content hash of a registered name.
    pub async fn register_content(&self, req: ContentRequest) -> Result<(), Error> {
        check_signature(&req.signature)?;
        let multihash = decode_cid_v0(&req.ipfs_hash)?;
        let message = storage_message(&req.name, req.chain_id, &req.ipfs_hash);
        self.authorize(req.chain_id, &req.name, &message, &req.signature)
            .await?;
        self.store.set_contenthash(&req.name, multihash);
        info!(name = %req.name, hash = %req.ipfs_hash, "updated content hash");
        Ok(())
    }

    /// Override the address a registered name answers for one coin type.
    pub async fn register_address(&self, req: AddressRequest) -> Result<(), Error> {
        check_signature(&req.signature)?;
        let address = parse_address(&req.address)?;
        let message = address_message(&req.name, req.coin_type, &req.address, req.chain_id);
        self.authorize(req.chain_id, &req.name, &message, &req.signature)
            .await?;
        self.store
            .set_addr_override(&req.name, req.coin_type, address);
        info!(name = %req.name, coin_type = req.coin_type, ?address, "updated address");
        Ok(())
    }

    /// Require that `signature` over `message` comes from the current holder of `name`'s token.
    ///
    /// Reads the holder live (bypassing the ownership cache) and refreshes the stored owner.
    async fn authorize(
        &self,
        chain_id: u64,
        name: &str,
        message: &str,
        signature: &str,
    ) -> Result<(), Error> {
        let record = self
            .store
            .name(name)
            .filter(|record| record.chain_id == chain_id)
            .ok_or(Error::NameNotRegistered)?;
        let domain = self
            .store
            .base_domain(base_name(name)?)
            .ok_or(Error::NameNotRegistered)?;

        let signer = recover_message_hex(message.as_bytes(), signature)?;
        let owner = self
            .chain
            .owner_of(chain_id, domain.token_contract, record.token_id)
            .await?;
        self.store.set_owner(name, owner);
        if owner != signer {
            debug!(name, ?owner, ?signer, "signer does not hold token");
            return Err(Error::SignerMismatch);
        }
        Ok(())
    }

    fn token_account(&self, domain: &BaseDomain, token_id: U256) -> Address {
        self.cfg
            .account
            .token_bound_account(domain.chain_id, domain.token_contract, token_id)
    }
}
