use super::{prg_share, xor_into, SelectionBits};
use crate::engine::SubQueryEngine;
use crate::error::{HybridPirError, Result};
use crate::partition::PartitionLayout;
use crate::config_err;
use tracing::debug;

/// Client side of RAID-PIR: builds explicit shares, combines answers
#[derive(Debug, Clone)]
pub struct RaidPirClient {
    layout: PartitionLayout,
}

impl RaidPirClient {
    pub fn new(layout: PartitionLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// Explicit shares for `block`, one per replica, given each replica's seed.
    ///
    /// Every share has `chunk_blocks` bits regardless of `block`.
    pub fn query(&self, block: usize, seeds: &[u64]) -> Result<Vec<SelectionBits>> {
        let servers = self.layout.servers;
        let r = self.layout.redundancy;
        let cb = self.layout.chunk_blocks();

        if seeds.len() != servers {
            return Err(config_err!("expected {} seeds, got {}", servers, seeds.len()));
        }
        if block >= self.layout.partitions {
            return Err(config_err!(
                "block {} out of range for {} partitions",
                block,
                self.layout.partitions
            ));
        }

        let shares: Vec<SelectionBits> = seeds.iter().map(|&s| prg_share(s, r, cb)).collect();

        let queries = (0..servers)
            .map(|j| {
                let mut explicit = vec![0u8; cb / 8];
                // replica j - m covers chunk j as its m-th chunk after its own
                for m in 1..r {
                    let i = (j + servers - m) % servers;
                    let segment = &shares[i].as_raw_slice()[(m - 1) * cb / 8..m * cb / 8];
                    xor_into(&mut explicit, segment);
                }
                let mut bits = SelectionBits::from_vec(explicit);
                if block / cb == j {
                    let pos = block % cb;
                    let current = bits[pos];
                    bits.set(pos, !current);
                }
                bits
            })
            .collect();

        debug!(servers, redundancy = r, chunk_blocks = cb, "built raidpir shares");
        Ok(queries)
    }

    /// XOR the replicas' answers. Order-independent.
    pub fn combine(&self, answers: &[Vec<u8>]) -> Result<Vec<u8>> {
        if answers.len() < self.layout.servers {
            return Err(HybridPirError::Quorum {
                required: self.layout.servers,
                received: answers.len(),
            });
        }
        let expected = answers[0].len();
        let mut result = vec![0u8; expected];
        for answer in answers {
            if answer.len() != expected {
                return Err(HybridPirError::Shape {
                    expected,
                    actual: answer.len(),
                });
            }
            xor_into(&mut result, answer);
        }
        Ok(result)
    }
}

impl SubQueryEngine for RaidPirClient {
    type Context = [u64];
    type Query = Vec<SelectionBits>;
    type Answer = [Vec<u8>];

    fn build_query(&self, selection: usize, seeds: &[u64]) -> Result<Self::Query> {
        self.query(selection, seeds)
    }

    fn reconstruct(&self, _selection: usize, answers: &[Vec<u8>]) -> Result<Vec<u8>> {
        self.combine(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::DatabaseDescriptor;

    fn client(servers: usize, redundancy: usize) -> RaidPirClient {
        let desc = DatabaseDescriptor::new(1 << 16, 8).unwrap();
        RaidPirClient::new(PartitionLayout::new(desc, redundancy, 256, servers).unwrap())
    }

    #[test]
    fn test_share_size_independent_of_block() {
        let c = client(4, 2);
        let seeds = [1, 2, 3, 4];
        let sizes: Vec<Vec<usize>> = [0usize, 70, 255]
            .iter()
            .map(|&b| c.query(b, &seeds).unwrap().iter().map(|q| q.len()).collect())
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] == w[1]));
        assert!(sizes[0].iter().all(|&len| len == 64));
    }

    #[test]
    fn test_combine_is_order_independent() {
        let c = client(3, 2);
        let answers = vec![vec![1u8, 2, 3, 4], vec![9, 9, 9, 9], vec![0xff, 0, 0xf0, 7]];
        let forward = c.combine(&answers).unwrap();
        let mut reversed = answers.clone();
        reversed.reverse();
        let rotated = vec![answers[1].clone(), answers[2].clone(), answers[0].clone()];
        assert_eq!(forward, c.combine(&reversed).unwrap());
        assert_eq!(forward, c.combine(&rotated).unwrap());
    }

    #[test]
    fn test_combine_needs_every_replica() {
        let c = client(3, 2);
        let err = c.combine(&[vec![0u8; 4], vec![0u8; 4]]).unwrap_err();
        assert!(matches!(err, HybridPirError::Quorum { required: 3, received: 2 }));
    }

    #[test]
    fn test_combine_rejects_ragged_answers() {
        let c = client(2, 2);
        let err = c.combine(&[vec![0u8; 4], vec![0u8; 5]]).unwrap_err();
        assert!(matches!(err, HybridPirError::Shape { expected: 4, actual: 5 }));
    }

    #[test]
    fn test_wrong_seed_count() {
        let c = client(4, 2);
        assert!(c.query(0, &[1, 2]).is_err());
    }
}
