//! Shamir-shared arithmetic with Beaver-triple multiplication
//!
//! Every interaction is an opening: each party broadcasts its shares of a
//! batch tagged with the current round, then reconstructs each value from the
//! shares that arrived. A multiplication opens `x - a` and `y - b` in a single
//! batch and finishes locally with the triple `(a, b, c)`.

use super::error::{ConfigErrorKind, Error, InputErrorKind, MPCErrorKind, Result};
use super::party::MultiParty;
use super::preprocessing::{decode, Preprocessed};
use super::runtime::{MpcRuntime, Preprocessing, SecretValue};
use super::shamir::{threshold::ThresholdScheme, SSServer, Share};
use super::SessionId;
use crate::math::{PrimeField, PrimeModulus, Uint};
use tracing::{debug, error, warn};

/// bytes before the shares of an opening message: round and count
const HEADER: usize = 12;

/// one party's view of a Beaver-triple runtime
pub struct BeaverRuntime {
    party: MultiParty,
    scheme: ThresholdScheme,
    material: Preprocessed,
    round: u64,
}

impl BeaverRuntime {
    pub fn new(party: MultiParty, scheme: ThresholdScheme, material: Preprocessed) -> Result<Self> {
        if party.size() != scheme.parties() || material.party() != party.id {
            error!(
                "party {} of {} cannot run a {}-party scheme with material for party {}",
                party.id,
                party.size(),
                scheme.parties(),
                material.party()
            );
            Err(ConfigErrorKind::InvalidThreshold {
                threshold: scheme.threshold(),
                parties: party.size(),
            })?;
        }
        if material.modulus() != scheme.modulus() {
            error!("preprocessing and scheme disagree on the modulus");
            Err(InputErrorKind::ModulusMismatch)?;
        }
        Ok(Self {
            party,
            scheme,
            material,
            round: 0,
        })
    }

    pub fn id(&self) -> usize {
        self.party.id
    }

    /// openings completed so far
    pub fn round(&self) -> u64 {
        self.round
    }

    /// opening message for `shares` in `round`
    fn frame(round: u64, shares: &[Share]) -> Vec<u8> {
        let mut msg = Vec::with_capacity(HEADER + shares.len() * Uint::BYTES);
        msg.extend(round.to_le_bytes());
        msg.extend((shares.len() as u32).to_le_bytes());
        for share in shares {
            msg.extend(PrimeModulus::encode(&share.0));
        }
        msg
    }

    /// opens all `shares` in one round
    pub fn open_batch(&mut self, shares: &[Share]) -> Result<Vec<PrimeField>> {
        let round = self.round;
        self.round += 1;
        self.party.broadcast(&Self::frame(round, shares))?;

        // columns[j][i] is party i's share of value j
        let mut columns: Vec<Vec<Option<PrimeField>>> = shares
            .iter()
            .map(|share| {
                let mut column = vec![None; self.party.size()];
                column[self.party.id] = Some(share.0);
                column
            })
            .collect();
        'peers: for peer in (0..self.party.size()).filter(|&peer| peer != self.party.id) {
            // a peer we gave up on earlier may still have older rounds queued
            let values = loop {
                let bytes = match self.party.recv(peer) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(
                            "party {} has no round {} shares from peer {}: {}",
                            self.party.id, round, peer, err
                        );
                        continue 'peers;
                    }
                };
                if let Some(values) = self.parse(peer, round, shares.len(), &bytes)? {
                    break values;
                }
            };
            for (column, value) in columns.iter_mut().zip(values) {
                column[peer] = Some(value);
            }
        }
        debug!("party {} finished round {}", self.party.id, round);
        columns
            .iter()
            .map(|column| self.scheme.recover(column))
            .collect()
    }

    /// checks a peer's opening message against the round we are in;
    /// `None` for a frame left over from an earlier round
    fn parse(
        &self,
        peer: usize,
        round: u64,
        count: usize,
        bytes: &[u8],
    ) -> Result<Option<Vec<PrimeField>>> {
        let malformed = || -> Error {
            error!("party {} got a malformed message from peer {}", self.party.id, peer);
            MPCErrorKind::MalformedMessage { peer }.into()
        };
        if bytes.len() < HEADER {
            return Err(malformed());
        }
        let (header, body) = bytes.split_at(HEADER);
        let mut word = [0u8; 8];
        word.copy_from_slice(&header[..8]);
        let got = u64::from_le_bytes(word);
        if got < round {
            debug!(
                "party {} dropped a stale round {} frame from peer {}",
                self.party.id, got, peer
            );
            return Ok(None);
        }
        if got > round {
            error!(
                "party {} expected round {} from peer {}, got {}",
                self.party.id, round, peer, got
            );
            Err(MPCErrorKind::RoundMismatch {
                peer,
                expected: round,
                got,
            })?;
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&header[8..]);
        if u32::from_le_bytes(word) as usize != count || body.len() != count * Uint::BYTES {
            return Err(malformed());
        }
        body.chunks(Uint::BYTES)
            .map(|chunk| {
                decode(self.scheme.modulus(), &Uint::from_be_slice(chunk)).map_err(|_| malformed())
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

impl MpcRuntime for BeaverRuntime {
    type Share = Share;

    fn modulus(&self) -> &PrimeModulus {
        self.scheme.modulus()
    }

    /// every point of a constant polynomial is the constant itself
    fn constant(&self, value: &PrimeField) -> Share {
        Share(*value)
    }

    fn multiply(&mut self, lhs: &Share, rhs: &Share) -> Result<Share> {
        let triple = self.material.next_triple()?;
        let masked = self.open_batch(&[lhs.sub(&triple.a), rhs.sub(&triple.b)])?;
        let (d, e) = (masked[0], masked[1]);
        // xy = c + d b + e a + d e
        Ok(triple
            .c
            .add(&triple.b.scale(&d))
            .add(&triple.a.scale(&e))
            .add(&self.constant(&(d * e))))
    }

    fn open(&mut self, share: &Share) -> Result<PrimeField> {
        Ok(self.open_batch(std::slice::from_ref(share))?[0])
    }
}

impl Preprocessing for BeaverRuntime {
    fn key_share(&mut self, session: SessionId) -> Result<Share> {
        self.material.key_share(session)
    }

    fn multiplications_left(&self) -> usize {
        self.material.triples_left()
    }
}

#[cfg(test)]
fn spawn_runtimes(
    modulus: PrimeModulus,
    threshold: usize,
    parties: usize,
    key: PrimeField,
    triples: usize,
) -> Vec<BeaverRuntime> {
    use super::preprocessing::Dealer;

    let scheme = ThresholdScheme::new(modulus, threshold, parties).unwrap();
    let bundles = Dealer::new(modulus, scheme).deal(&[(0, key)], triples);
    MultiParty::local_mesh(parties)
        .into_iter()
        .zip(bundles)
        .map(|(party, material)| BeaverRuntime::new(party, scheme, material).unwrap())
        .collect()
}

#[test]
fn test_beaver_multiplication() {
    use std::thread;

    let modulus = PrimeModulus::bls12_381_scalar();
    let key = modulus.make_u64(12);
    let runtimes = spawn_runtimes(modulus, 1, 4, key, 2);
    let opened: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = runtimes
            .into_iter()
            .map(|mut runtime| {
                scope.spawn(move || {
                    let k = runtime.key_share(0).unwrap();
                    let square = runtime.multiply(&k, &k).unwrap();
                    let cube = runtime.multiply(&square, &k).unwrap();
                    let shifted = cube.add(&runtime.constant(&modulus.make_u64(4)));
                    let value = runtime.open(&shifted).unwrap();
                    assert_eq!(runtime.round(), 3);
                    assert_eq!(runtime.multiplications_left(), 0);
                    value
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });
    assert!(opened.iter().all(|value| *value == modulus.make_u64(12 * 12 * 12 + 4)));
}

#[test]
fn test_open_tolerates_missing_parties() {
    use std::thread;

    let modulus = PrimeModulus::bls12_381_scalar();
    let key = modulus.random_make();
    let mut runtimes = spawn_runtimes(modulus, 1, 4, key, 0);
    // party 3 leaves before the opening
    drop(runtimes.pop());
    let opened: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = runtimes
            .into_iter()
            .map(|mut runtime| {
                scope.spawn(move || {
                    let k = runtime.key_share(0).unwrap();
                    runtime.open(&k)
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });
    assert_eq!(opened, vec![Ok(key); 3]);
}

#[test]
fn test_rejects_future_rounds_and_garbage() {
    let modulus = PrimeModulus::bls12_381_scalar();
    let mut runtimes = spawn_runtimes(modulus, 1, 3, modulus.one(), 0);
    let runtime = &runtimes[0];
    let msg = BeaverRuntime::frame(5, &[Share(modulus.make_u64(3))]);
    assert_eq!(
        runtime.parse(1, 0, 1, &msg),
        Err(Error::MPCError(MPCErrorKind::RoundMismatch {
            peer: 1,
            expected: 0,
            got: 5
        }))
    );
    assert_eq!(runtime.parse(1, 5, 1, &msg), Ok(Some(vec![modulus.make_u64(3)])));
    // older rounds are skipped, even with a body that would not parse now
    assert_eq!(runtime.parse(1, 6, 1, &msg), Ok(None));
    assert_eq!(runtime.parse(1, 6, 4, &msg), Ok(None));
    assert_eq!(
        runtime.parse(2, 5, 2, &msg),
        Err(Error::MPCError(MPCErrorKind::MalformedMessage { peer: 2 }))
    );
    let mut overflow = 5u64.to_le_bytes().to_vec();
    overflow.extend(1u32.to_le_bytes());
    overflow.extend(modulus.modulus().to_be_bytes());
    assert_eq!(
        runtime.parse(1, 5, 1, &overflow),
        Err(Error::MPCError(MPCErrorKind::MalformedMessage { peer: 1 }))
    );
    assert_eq!(
        runtime.parse(1, 5, 1, &msg[..HEADER - 1]),
        Err(Error::MPCError(MPCErrorKind::MalformedMessage { peer: 1 }))
    );

    // a peer that runs ahead of us fails the opening
    let liar = runtimes.pop().unwrap();
    liar.party.send(0, &msg).unwrap();
    drop(liar);
    drop(runtimes.pop());
    let error = runtimes[0].open(&Share(modulus.one())).unwrap_err();
    assert!(matches!(
        error,
        Error::MPCError(MPCErrorKind::RoundMismatch { peer: 2, .. })
    ));
}

#[test]
fn test_late_peer_does_not_break_later_rounds() {
    use std::time::Duration;

    let modulus = PrimeModulus::bls12_381_scalar();
    let key = modulus.random_make();
    let mut runtimes = spawn_runtimes(modulus, 1, 3, key, 0);
    let shares: Vec<_> = runtimes
        .iter_mut()
        .map(|runtime| runtime.key_share(0).unwrap())
        .collect();
    runtimes[0].party.set_timeout(Duration::from_millis(50)).unwrap();

    // party 2 misses round 0, so party 0 recovers from two shares
    runtimes[1].party.send(0, &BeaverRuntime::frame(0, &[shares[1]])).unwrap();
    assert_eq!(runtimes[0].open(&shares[0]), Ok(key));

    // its round 0 frame shows up ahead of round 1
    let doubled: Vec<_> = shares.iter().map(|share| share.add(share)).collect();
    runtimes[2].party.send(0, &BeaverRuntime::frame(0, &[shares[2]])).unwrap();
    runtimes[2].party.send(0, &BeaverRuntime::frame(1, &[doubled[2]])).unwrap();
    runtimes[1].party.send(0, &BeaverRuntime::frame(1, &[doubled[1]])).unwrap();
    assert_eq!(runtimes[0].open(&doubled[0]), Ok(key + key));
    assert_eq!(runtimes[0].round(), 2);
}
