use comb_dag::Dag;
use comb_ty::{decode_value, BitIter, DecodeError, FinalTy, Value};

use super::{CheckError, LocatedError};

/// Replace each witness payload with `decode(output type, payload)`.
/// Nodes are visited in stored order, so a decoder drawing from a shared
/// stream reads payloads in the order they were packed.
pub fn decode_witnesses<J, W, V, E>(
    dag: Dag<J, FinalTy, W>,
    mut decode: impl FnMut(&FinalTy, W) -> Result<V, E>,
) -> Result<Dag<J, FinalTy, V>, LocatedError>
where
    E: Into<CheckError>,
{
    dag.into_iter()
        .enumerate()
        .map(|(pos, node)| {
            node.try_map(Ok, |ty, w| decode(ty, w), Ok)
                .map_err(|e| LocatedError::at(pos, e))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Dag::new)
}

/// Decode every witness from a packed bit stream, ignoring existing payloads.
pub fn decode_witnesses_from_bits<J, W>(
    dag: Dag<J, FinalTy, W>,
    bits: &mut BitIter<'_>,
) -> Result<Dag<J, FinalTy, Value>, LocatedError> {
    let decoded = decode_witnesses(dag, |ty, _| decode_value(ty, bits))?;
    log::debug!("decoded witnesses from {} bits", bits.bits_read());
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use comb_dag::{CorePrim, TermF};

    use super::*;

    fn witness(b: FinalTy) -> TermF<CorePrim, FinalTy, (), u64> {
        TermF::Witness {
            a: FinalTy::unit(),
            b,
            w: (),
        }
    }

    #[test]
    fn payloads_follow_node_order() {
        let dag = Dag::new(vec![
            witness(FinalTy::bit()),
            TermF::Unit { a: FinalTy::unit() },
            witness(FinalTy::word(4).unwrap()),
        ]);
        let mut bits = BitIter::new(&[0b1_1001_000]);
        let decoded = decode_witnesses_from_bits(dag, &mut bits).unwrap();

        assert!(matches!(&decoded[0], TermF::Witness { w, .. } if *w == Value::bit(true)));
        assert!(matches!(&decoded[1], TermF::Unit { .. }));
        assert!(matches!(&decoded[2], TermF::Witness { w, .. } if w.as_word() == Some(0b1001)));
        assert_eq!(bits.bits_read(), 5);
    }

    #[test]
    fn short_stream_names_the_node() {
        let dag = Dag::new(vec![witness(FinalTy::bit()), witness(FinalTy::word(8).unwrap())]);
        let err = decode_witnesses_from_bits(dag, &mut BitIter::new(&[0xff])).unwrap_err();
        assert_eq!(err.at_node, Some(1));
        assert_eq!(err.error, CheckError::Decode(DecodeError::EndOfStream { read: 8 }));
    }
}
