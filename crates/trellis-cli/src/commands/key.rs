use super::print_json;
use anyhow::Result;
use clap::Args;
use serde_json::json;
use trellis_core::signing::{
    decode_hex, generate_signing_keypair, sign_message, verify_signature,
};

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct MessageArgs {
    /// Message text, signed as its UTF-8 bytes
    #[arg(long)]
    message: Option<String>,

    /// Message bytes as hex
    #[arg(long = "hex")]
    hex_message: Option<String>,
}

impl MessageArgs {
    fn bytes(self) -> Result<Vec<u8>> {
        match (self.message, self.hex_message) {
            (Some(text), _) => Ok(text.into_bytes()),
            (None, Some(hex)) => Ok(decode_hex("message", &hex)?),
            (None, None) => Ok(Vec::new()),
        }
    }
}

pub fn generate(json: bool) -> Result<()> {
    let keypair = generate_signing_keypair();
    if json {
        return print_json(&keypair);
    }
    println!("Key ID:      {}", keypair.key_id);
    println!("Public key:  {}", hex::encode(&keypair.public_key));
    println!("Secret key:  {}", hex::encode(&keypair.secret_key));
    Ok(())
}

pub fn sign(secret_key: String, message: MessageArgs, json: bool) -> Result<()> {
    let secret_key = decode_hex("secret key", &secret_key)?;
    let signature = hex::encode(sign_message(&message.bytes()?, &secret_key)?);
    if json {
        print_json(&json!({ "signature": signature }))
    } else {
        println!("{}", signature);
        Ok(())
    }
}

pub fn verify(
    public_key: String,
    signature: String,
    message: MessageArgs,
    json: bool,
) -> Result<()> {
    let public_key = decode_hex("public key", &public_key)?;
    let signature = decode_hex("signature", &signature)?;
    let valid = verify_signature(&message.bytes()?, &signature, &public_key);
    if json {
        print_json(&json!({ "valid": valid }))
    } else {
        println!("{}", if valid { "valid" } else { "invalid" });
        Ok(())
    }
}
